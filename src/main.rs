use std::env::args_os;
use std::process::ExitCode;

use vq_image_compressor::{
    compress_image_file, decompress_artifact_file, CLIParser, Mode, Outcome,
};

fn main() -> ExitCode {
    let mut cli_parser = CLIParser::default();
    let arguments = cli_parser.parse(args_os());
    match arguments.mode() {
        Mode::Compress => match compress_image_file(&arguments) {
            Ok(Outcome::Completed(report)) => println!("Compression successful. {}", report),
            Ok(Outcome::Aborted) => println!("Compression aborted, no file written"),
            Err(e) => {
                eprintln!("Compression failed because of: {}", e);
                return ExitCode::FAILURE;
            }
        },
        Mode::Decompress => match decompress_artifact_file(&arguments) {
            Ok(_) => println!("Decompression successful"),
            Err(e) => {
                eprintln!("Decompression failed because of: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}
