//! Fluctuation-matching force constants.
//!
//! Each bond of the elastic network is a harmonic spring. Initial force
//! constants follow equipartition, `Kb = k_B T / σ²`, and are refined by
//! comparing target (all-atom) and current (CG normal-mode) bond-length
//! fluctuations.

use super::error::EngineError;
use super::stats::BOND_COLUMN;
use crate::core::tables::{BondKey, RowKey, Table, TableError};

/// Boltzmann constant in kcal/(mol·K).
pub const K_B: f64 = 0.0019872041;

pub const KB_COLUMN: &str = "Kb";
pub const B0_COLUMN: &str = "b0";

fn inverse_variance(sigma: f64) -> f64 {
    if sigma > 0.0 { 1.0 / (sigma * sigma) } else { 0.0 }
}

fn missing(key: &BondKey) -> EngineError {
    EngineError::MissingRow(key.to_fields().join(" "))
}

/// Equilibrium distances and equipartition force constants.
///
/// Returns a table with columns `Kb` and `b0`, in the row order of
/// `average`. Bonds that do not fluctuate get `Kb = 0`.
pub fn initial_parameters(
    average: &Table<BondKey>,
    fluct: &Table<BondKey>,
    temperature: f64,
) -> Result<Table<BondKey>, EngineError> {
    let kt = K_B * temperature;
    let mut params = Table::new(vec![KB_COLUMN.to_string(), B0_COLUMN.to_string()]);
    for (key, b0) in average.column(BOND_COLUMN)? {
        let sigma = fluct.value(key, BOND_COLUMN).ok_or_else(|| missing(key))?;
        params.push_row(key.clone(), vec![kt * inverse_variance(sigma), b0])?;
    }
    Ok(params)
}

/// One fluctuation-matching step:
/// `Kb' = max(0, Kb - α (k_B T / σ_c² - k_B T / σ_t²))`.
///
/// A network that fluctuates less than the target (σ_c < σ_t) is softened.
/// For a lone spring `σ_c² = k_B T / Kb`, so the error shrinks by `1 - α`
/// each step.
///
/// `kb` holds a `Kb` column; `target` and `current` hold bond-length
/// fluctuations in `r_IJ`. Every row of `kb` must appear in both.
pub fn update_force_constants(
    kb: &Table<BondKey>,
    target: &Table<BondKey>,
    current: &Table<BondKey>,
    alpha: f64,
    temperature: f64,
) -> Result<Table<BondKey>, EngineError> {
    let kt = K_B * temperature;
    let rows = kb
        .column(KB_COLUMN)?
        .into_iter()
        .map(|(key, k)| {
            let sigma_t = target.value(key, BOND_COLUMN).ok_or_else(|| missing(key))?;
            let sigma_c = current.value(key, BOND_COLUMN).ok_or_else(|| missing(key))?;
            let step = kt * (inverse_variance(sigma_c) - inverse_variance(sigma_t));
            Ok((key.clone(), (k - alpha * step).max(0.0)))
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(Table::from_column(KB_COLUMN, rows)?)
}

/// Root-mean-square difference between target and current fluctuations,
/// over the rows of `target`.
pub fn fluctuation_rmsd(
    target: &Table<BondKey>,
    current: &Table<BondKey>,
) -> Result<f64, EngineError> {
    let column = target.column(BOND_COLUMN)?;
    if column.is_empty() {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for (key, t) in &column {
        let c = current.value(key, BOND_COLUMN).ok_or_else(|| missing(key))?;
        sum += (t - c).powi(2);
    }
    Ok((sum / column.len() as f64).sqrt())
}

/// The `b0` column of a parameter table as an `r_IJ` bond-length table.
pub fn equilibrium_lengths(params: &Table<BondKey>) -> Result<Table<BondKey>, TableError> {
    let b0 = params.column(B0_COLUMN)?;
    Table::from_column(BOND_COLUMN, b0.into_iter().map(|(k, v)| (k.clone(), v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond(i: isize) -> BondKey {
        BondKey::new(("A", i, "CA"), ("A", i + 1, "CA"))
    }

    fn r_table(values: &[(isize, f64)]) -> Table<BondKey> {
        Table::from_column(BOND_COLUMN, values.iter().map(|&(i, v)| (bond(i), v))).unwrap()
    }

    #[test]
    fn initial_force_constants_follow_equipartition() {
        let average = r_table(&[(1, 3.8), (2, 3.9)]);
        let fluct = r_table(&[(1, 0.5), (2, 0.0)]);
        let params = initial_parameters(&average, &fluct, 300.0).unwrap();

        let kb = params.value(&bond(1), KB_COLUMN).unwrap();
        assert!((kb - K_B * 300.0 / 0.25).abs() < 1e-12);
        assert_eq!(params.value(&bond(1), B0_COLUMN), Some(3.8));
        assert_eq!(params.value(&bond(2), KB_COLUMN), Some(0.0));
    }

    #[test]
    fn update_moves_towards_target_and_clamps_at_zero() {
        let kb = Table::from_column(KB_COLUMN, [(bond(1), 10.0), (bond(2), 0.1)]).unwrap();
        let target = r_table(&[(1, 0.5), (2, 1.0)]);
        let current = r_table(&[(1, 1.0), (2, 0.1)]);

        let updated = update_force_constants(&kb, &target, &current, 1.0, 300.0).unwrap();
        let kt = K_B * 300.0;
        let expected = 10.0 - (kt / 1.0 - kt / 0.25);
        assert!((updated.value(&bond(1), KB_COLUMN).unwrap() - expected).abs() < 1e-12);
        assert_eq!(updated.value(&bond(2), KB_COLUMN), Some(0.0));
    }

    #[test]
    fn missing_rows_are_errors() {
        let kb = Table::from_column(KB_COLUMN, [(bond(1), 1.0)]).unwrap();
        let empty = r_table(&[]);
        assert!(matches!(
            update_force_constants(&kb, &empty, &empty, 1.0, 300.0),
            Err(EngineError::MissingRow(_))
        ));
    }

    #[test]
    fn rmsd_of_fluctuations() {
        let target = r_table(&[(1, 1.0), (2, 2.0)]);
        let current = r_table(&[(1, 2.0), (2, 4.0)]);
        let rmsd = fluctuation_rmsd(&target, &current).unwrap();
        assert!((rmsd - (2.5f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn repeated_updates_converge_on_a_lone_spring() {
        let temperature = 300.0;
        let kt = K_B * temperature;
        let target = r_table(&[(1, 0.2)]);
        let mut kb = Table::from_column(KB_COLUMN, [(bond(1), 1.0)]).unwrap();
        for _ in 0..40 {
            let k = kb.value(&bond(1), KB_COLUMN).unwrap();
            let current = r_table(&[(1, (kt / k).sqrt())]);
            kb = update_force_constants(&kb, &target, &current, 0.5, temperature).unwrap();
        }
        let k = kb.value(&bond(1), KB_COLUMN).unwrap();
        assert!((k - kt / 0.04).abs() < 1e-6);
    }

    #[test]
    fn equilibrium_lengths_are_the_b0_column() {
        let average = r_table(&[(1, 3.8), (2, 3.9)]);
        let fluct = r_table(&[(1, 0.5), (2, 0.4)]);
        let params = initial_parameters(&average, &fluct, 300.0).unwrap();

        let lengths = equilibrium_lengths(&params).unwrap();
        assert_eq!(lengths.columns(), [BOND_COLUMN]);
        assert_eq!(lengths.value(&bond(2), BOND_COLUMN), Some(3.9));
        assert!(equilibrium_lengths(&r_table(&[])).is_err());
    }
}
