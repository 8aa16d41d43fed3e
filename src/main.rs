fn main() {
    loxtest::cli::run();
}
