use x690::CerElement;

fn main() {
    x690::cli::run_encode::<CerElement>()
}
