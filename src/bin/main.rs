use std::env;

use quill::Quill;

fn main() -> Result<(), anyhow::Error> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();

    let mut quill = Quill::new();
    match args.len() {
        0 => quill.run_prompt(),
        1 => {
            let filename = args.pop().unwrap();
            quill.run_file(filename.as_ref())?;

            if quill.had_error() {
                std::process::exit(65);
            }
            if quill.had_runtime_error() {
                std::process::exit(70);
            }
            Ok(())
        }
        _ => {
            let bin_name = env!("CARGO_BIN_NAME");
            println!("Usage: {} [script]", bin_name);
            std::process::exit(64);
        }
    }
}
