use fluctmatch::engine::cg::available_models;

pub fn run() {
    println!("Available coarse-grained models:");
    for model in available_models() {
        println!("  {:<8} {}", model.name(), model.description());
    }
}
