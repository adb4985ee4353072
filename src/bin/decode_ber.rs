use x690::BerElement;

fn main() {
    x690::cli::run_decode::<BerElement>()
}
