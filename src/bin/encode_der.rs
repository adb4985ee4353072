use x690::DerElement;

fn main() {
    x690::cli::run_encode::<DerElement>()
}
