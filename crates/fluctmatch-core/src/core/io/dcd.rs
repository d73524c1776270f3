use crate::core::models::frame::Frame;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

const HEADER_LEN: usize = 84;
const TITLE_LEN: usize = 80;
const CHARMM_VERSION: i32 = 24;
/// Upper bound on the title record: the line count plus 256 title lines.
const MAX_TITLE_RECORD: usize = 4 + 256 * TITLE_LEN;

#[derive(Debug, Error)]
pub enum DcdError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a CHARMM DCD file (missing CORD header)")]
    NotDcd,
    #[error("Fortran record markers disagree: {start} != {end}")]
    RecordMismatch { start: i32, end: i32 },
    #[error("Invalid {what} record marker {marker} (at most {max} bytes allowed)")]
    InvalidMarker {
        what: &'static str,
        marker: i32,
        max: usize,
    },
    #[error("Unexpected {what} record length: expected {expected}, found {found}")]
    RecordLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("DCD files with {0} fixed atoms are not supported")]
    FixedAtoms(i32),
    #[error("Frame has {found} atoms, expected {expected}")]
    AtomCount { expected: usize, found: usize },
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_le_bytes(b))
}

/// Reads one Fortran record of at most `max` bytes.
///
/// The marker is validated before anything is allocated, and the payload
/// buffer only grows with the bytes actually present.
fn read_record<R: Read>(r: &mut R, what: &'static str, max: usize) -> Result<Vec<u8>, DcdError> {
    let start = read_i32(r)?;
    let len = usize::try_from(start)
        .ok()
        .filter(|&len| len <= max)
        .ok_or(DcdError::InvalidMarker {
            what,
            marker: start,
            max,
        })?;
    let mut payload = Vec::new();
    r.by_ref().take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    let end = read_i32(r)?;
    if start != end {
        return Err(DcdError::RecordMismatch { start, end });
    }
    Ok(payload)
}

fn read_sized_record<R: Read>(
    r: &mut R,
    what: &'static str,
    expected: usize,
) -> Result<Vec<u8>, DcdError> {
    let payload = read_record(r, what, expected)?;
    if payload.len() != expected {
        return Err(DcdError::RecordLength {
            what,
            expected,
            found: payload.len(),
        });
    }
    Ok(payload)
}

fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len() as i32;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(payload)?;
    w.write_all(&len.to_le_bytes())
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(b)
}

fn f32s(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

/// Converts the on-disk `[A, gamma, B, beta, alpha, C]` record into
/// `[a, b, c, alpha, beta, gamma]` in degrees. Angles stored as cosines
/// (all within [-1, 1]) are converted.
fn decode_unit_cell(bytes: &[u8]) -> [f64; 6] {
    let mut raw = [0f64; 6];
    for (value, chunk) in raw.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut b = [0u8; 8];
        b.copy_from_slice(chunk);
        *value = f64::from_le_bytes(b);
    }
    let mut angles = [raw[4], raw[3], raw[1]];
    if angles.iter().all(|a| (-1.0..=1.0).contains(a)) {
        for a in &mut angles {
            *a = a.acos().to_degrees();
        }
    }
    [raw[0], raw[2], raw[5], angles[0], angles[1], angles[2]]
}

fn encode_unit_cell(cell: &[f64; 6]) -> Vec<u8> {
    let [a, b, c, alpha, beta, gamma] = *cell;
    [a, gamma, b, beta, alpha, c]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Header information of a DCD trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct DcdHeader {
    pub n_frames: usize,
    pub n_atoms: usize,
    pub start: i32,
    pub interval: i32,
    /// Time step in AKMA units.
    pub delta: f32,
    pub has_unit_cell: bool,
    pub title: Vec<String>,
    four_dims: bool,
}

/// Streaming reader of little-endian CHARMM DCD trajectories.
///
/// Frames are produced lazily through [`Iterator`]; the reader stops after
/// the number of frames announced in the header, or at a clean end of file
/// when the header announces none.
pub struct DcdReader<R: Read> {
    reader: R,
    header: DcdHeader,
    read: usize,
    done: bool,
}

impl DcdReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DcdError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> DcdReader<R> {
    pub fn new(mut reader: R) -> Result<Self, DcdError> {
        let marker = read_i32(&mut reader)?;
        if usize::try_from(marker).ok() != Some(HEADER_LEN) {
            return Err(DcdError::NotDcd);
        }
        let mut hdr = vec![0u8; HEADER_LEN];
        reader.read_exact(&mut hdr)?;
        let end = read_i32(&mut reader)?;
        if end != marker {
            return Err(DcdError::RecordMismatch { start: marker, end });
        }
        if &hdr[0..4] != b"CORD" {
            return Err(DcdError::NotDcd);
        }

        let icntrl: Vec<i32> = (0..20).map(|i| i32_at(&hdr, 4 + 4 * i)).collect();
        if icntrl[8] > 0 {
            return Err(DcdError::FixedAtoms(icntrl[8]));
        }
        let delta = f32::from_le_bytes([hdr[40], hdr[41], hdr[42], hdr[43]]);
        let has_unit_cell = icntrl[10] != 0;
        let four_dims = icntrl[11] != 0;

        let title_block = read_record(&mut reader, "title", MAX_TITLE_RECORD)?;
        let title = if title_block.len() >= 4 {
            title_block[4..]
                .chunks(TITLE_LEN)
                .map(|line| String::from_utf8_lossy(line).trim_end_matches(['\0', ' ']).to_string())
                .collect()
        } else {
            Vec::new()
        };

        let natom = read_sized_record(&mut reader, "atom count", 4)?;
        let n_atoms = i32_at(&natom, 0).max(0) as usize;

        Ok(Self {
            reader,
            header: DcdHeader {
                n_frames: icntrl[0].max(0) as usize,
                n_atoms,
                start: icntrl[1],
                interval: icntrl[2],
                delta,
                has_unit_cell,
                title,
                four_dims,
            },
            read: 0,
            done: false,
        })
    }

    pub fn header(&self) -> &DcdHeader {
        &self.header
    }

    pub fn n_atoms(&self) -> usize {
        self.header.n_atoms
    }

    pub fn n_frames(&self) -> usize {
        self.header.n_frames
    }

    fn read_frame(&mut self) -> Result<Frame, DcdError> {
        let n = self.header.n_atoms;
        let unit_cell = if self.header.has_unit_cell {
            let cell = read_sized_record(&mut self.reader, "unit cell", 48)?;
            Some(decode_unit_cell(&cell))
        } else {
            None
        };
        let xs = read_sized_record(&mut self.reader, "x coordinate", 4 * n)?;
        let ys = read_sized_record(&mut self.reader, "y coordinate", 4 * n)?;
        let zs = read_sized_record(&mut self.reader, "z coordinate", 4 * n)?;
        if self.header.four_dims {
            read_sized_record(&mut self.reader, "w coordinate", 4 * n)?;
        }

        let positions = f32s(&xs)
            .zip(f32s(&ys))
            .zip(f32s(&zs))
            .map(|((x, y), z)| Point3::new(x as f64, y as f64, z as f64))
            .collect();
        Ok(Frame {
            positions,
            unit_cell,
        })
    }
}

impl<R: Read> Iterator for DcdReader<R> {
    type Item = Result<Frame, DcdError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || (self.header.n_frames > 0 && self.read >= self.header.n_frames) {
            return None;
        }
        match self.read_frame() {
            Ok(frame) => {
                self.read += 1;
                Some(Ok(frame))
            }
            Err(DcdError::Io(e))
                if self.header.n_frames == 0 && e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.header.n_frames == 0 {
            return (0, None);
        }
        let remaining = self.header.n_frames.saturating_sub(self.read);
        (0, Some(remaining))
    }
}

/// Options for [`DcdWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct DcdOptions {
    pub delta: f32,
    pub unit_cell: bool,
    pub title: Vec<String>,
}

impl Default for DcdOptions {
    fn default() -> Self {
        Self {
            delta: 1.0,
            unit_cell: false,
            title: vec![super::traits::DEFAULT_TITLE.to_string()],
        }
    }
}

/// Writer of little-endian CHARMM DCD trajectories.
///
/// The header is written up front with a frame count of zero; [`DcdWriter::finish`]
/// rewrites it with the number of frames actually written.
pub struct DcdWriter<W: Write + Seek> {
    writer: W,
    n_atoms: usize,
    unit_cell: bool,
    written: usize,
}

impl DcdWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(
        path: P,
        n_atoms: usize,
        options: &DcdOptions,
    ) -> Result<Self, DcdError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), n_atoms, options)
    }
}

impl<W: Write + Seek> DcdWriter<W> {
    pub fn new(mut writer: W, n_atoms: usize, options: &DcdOptions) -> Result<Self, DcdError> {
        let mut icntrl = [0i32; 20];
        icntrl[1] = 1;
        icntrl[2] = 1;
        icntrl[10] = i32::from(options.unit_cell);
        icntrl[19] = CHARMM_VERSION;

        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(b"CORD");
        for v in icntrl {
            header.extend_from_slice(&v.to_le_bytes());
        }
        header[40..44].copy_from_slice(&options.delta.to_le_bytes());
        write_record(&mut writer, &header)?;

        let mut title = Vec::with_capacity(4 + TITLE_LEN * options.title.len());
        title.extend_from_slice(&(options.title.len() as i32).to_le_bytes());
        for line in &options.title {
            let mut padded = [b' '; TITLE_LEN];
            let bytes = line.as_bytes();
            let n = bytes.len().min(TITLE_LEN);
            padded[..n].copy_from_slice(&bytes[..n]);
            title.extend_from_slice(&padded);
        }
        write_record(&mut writer, &title)?;
        write_record(&mut writer, &(n_atoms as i32).to_le_bytes())?;

        Ok(Self {
            writer,
            n_atoms,
            unit_cell: options.unit_cell,
            written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), DcdError> {
        if frame.n_atoms() != self.n_atoms {
            return Err(DcdError::AtomCount {
                expected: self.n_atoms,
                found: frame.n_atoms(),
            });
        }
        if self.unit_cell {
            let cell = frame.unit_cell.unwrap_or([0.0, 0.0, 0.0, 90.0, 90.0, 90.0]);
            write_record(&mut self.writer, &encode_unit_cell(&cell))?;
        }
        for axis in 0..3 {
            let block: Vec<u8> = frame
                .positions
                .iter()
                .flat_map(|p| (p[axis] as f32).to_le_bytes())
                .collect();
            write_record(&mut self.writer, &block)?;
        }
        self.written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    /// Records the frame count in the header and flushes the output.
    pub fn finish(mut self) -> Result<W, DcdError> {
        let nset = self.written as i32;
        // NSET follows the record marker and "CORD"; NSTEP is icntrl[3].
        self.writer.seek(SeekFrom::Start(8))?;
        self.writer.write_all(&nset.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(20))?;
        self.writer.write_all(&nset.to_le_bytes())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(offset: f64, n: usize) -> Frame {
        Frame::new(
            (0..n)
                .map(|i| Point3::new(offset + i as f64, 2.0 * i as f64, -0.5))
                .collect(),
        )
    }

    fn write_frames(frames: &[Frame], options: &DcdOptions) -> Vec<u8> {
        let n = frames[0].n_atoms();
        let mut writer = DcdWriter::new(Cursor::new(Vec::new()), n, options).unwrap();
        for f in frames {
            writer.write_frame(f).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn header_reports_counts_and_title() {
        let bytes = write_frames(&[frame(0.0, 3), frame(1.0, 3)], &DcdOptions::default());
        let reader = DcdReader::new(Cursor::new(bytes)).unwrap();

        assert_eq!(reader.n_atoms(), 3);
        assert_eq!(reader.n_frames(), 2);
        assert_eq!(reader.header().title, vec!["Written by fluctmatch.".to_string()]);
        assert!(!reader.header().has_unit_cell);
    }

    #[test]
    fn frames_stream_back_in_order() {
        let frames = vec![frame(0.0, 4), frame(10.0, 4), frame(20.0, 4)];
        let bytes = write_frames(&frames, &DcdOptions::default());

        let read: Vec<Frame> = DcdReader::new(Cursor::new(bytes))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, frames);
    }

    #[test]
    fn unit_cell_is_stored_and_recovered() {
        let mut f = frame(0.0, 2);
        f.unit_cell = Some([30.0, 40.0, 50.0, 90.0, 100.0, 120.0]);
        let options = DcdOptions {
            unit_cell: true,
            ..DcdOptions::default()
        };
        let bytes = write_frames(&[f.clone()], &options);

        let read = DcdReader::new(Cursor::new(bytes))
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(read.unit_cell, f.unit_cell);
    }

    #[test]
    fn cosine_angles_are_converted_to_degrees() {
        let raw: Vec<u8> = [10.0f64, 0.5, 20.0, 0.0, 0.0, 30.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let cell = decode_unit_cell(&raw);
        assert_eq!(&cell[..3], &[10.0, 20.0, 30.0]);
        assert!((cell[3] - 90.0).abs() < 1e-9);
        assert!((cell[4] - 90.0).abs() < 1e-9);
        assert!((cell[5] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn wrong_atom_count_is_rejected_on_write() {
        let mut writer =
            DcdWriter::new(Cursor::new(Vec::new()), 3, &DcdOptions::default()).unwrap();
        assert!(matches!(
            writer.write_frame(&frame(0.0, 2)),
            Err(DcdError::AtomCount {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn fixed_atoms_are_rejected() {
        let mut bytes = write_frames(&[frame(0.0, 2)], &DcdOptions::default());
        // icntrl[8] lives at payload offset 4 + 32.
        bytes[4 + 4 + 32..4 + 4 + 36].copy_from_slice(&1i32.to_le_bytes());
        assert!(matches!(
            DcdReader::new(Cursor::new(bytes)),
            Err(DcdError::FixedAtoms(1))
        ));
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut bytes = write_frames(&[frame(0.0, 2), frame(1.0, 2)], &DcdOptions::default());
        bytes.truncate(bytes.len() - 6);
        let results: Vec<_> = DcdReader::new(Cursor::new(bytes)).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn garbage_is_not_a_dcd() {
        let bytes = vec![0u8; 16];
        assert!(matches!(
            DcdReader::new(Cursor::new(bytes)),
            Err(DcdError::NotDcd)
        ));
    }

    #[test]
    fn negative_title_marker_is_rejected() {
        let mut bytes = write_frames(&[frame(0.0, 2)], &DcdOptions::default());
        let title_marker = 4 + HEADER_LEN + 4;
        bytes[title_marker..title_marker + 4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            DcdReader::new(Cursor::new(bytes)),
            Err(DcdError::InvalidMarker {
                what: "title",
                marker: -1,
                ..
            })
        ));
    }

    #[test]
    fn oversized_coordinate_marker_is_rejected_before_reading() {
        let mut bytes = write_frames(&[frame(0.0, 2)], &DcdOptions::default());
        // One frame of two atoms: three records of 4 + 8 + 4 bytes.
        let x_marker = bytes.len() - 3 * 16;
        bytes[x_marker..x_marker + 4].copy_from_slice(&i32::MAX.to_le_bytes());

        let mut reader = DcdReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(DcdError::InvalidMarker {
                what: "x coordinate",
                max: 8,
                ..
            }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn marker_longer_than_the_data_is_an_io_error() {
        let mut bytes = write_frames(&[frame(0.0, 2)], &DcdOptions::default());
        let title_marker = 4 + HEADER_LEN + 4;
        bytes[title_marker..title_marker + 4]
            .copy_from_slice(&(MAX_TITLE_RECORD as i32).to_le_bytes());
        assert!(matches!(
            DcdReader::new(Cursor::new(bytes)),
            Err(DcdError::Io(_))
        ));
    }
}
