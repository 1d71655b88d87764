/// Binary entrypoint for the `ephemera` executable.
///
/// Keeps the binary thin — all behaviour lives in the `ephemera_lib` crate so
/// unit tests can import library functions directly.
fn main() {
    ephemera_lib::run();
}
