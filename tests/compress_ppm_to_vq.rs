use std::fs;
use std::path::PathBuf;

use vq_image_compressor::{
    compress_image_file, compress_image_file_with_cancellation, decompress_artifact_file,
    CLIParser, CancellationToken, Outcome,
};

const IMAGE_WIDTH: usize = 37;
const IMAGE_HEIGHT: usize = 21;

fn get_work_path(file_name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
    path.push(file_name);
    path
}

fn cleanup(paths: &[&PathBuf]) {
    for path in paths {
        if path.exists() && path.is_file() {
            fs::remove_file(path).expect("Deletion of output file failed");
        }
    }
}

fn write_test_image(path: &PathBuf) {
    let mut content = format!("P6\n# gradient\n{} {}\n255\n", IMAGE_WIDTH, IMAGE_HEIGHT).into_bytes();
    for row in 0..IMAGE_HEIGHT {
        for column in 0..IMAGE_WIDTH {
            content.push((column * 7) as u8);
            content.push((row * 12) as u8);
            content.push(((column + row) * 3) as u8);
        }
    }
    fs::write(path, content).expect("Writing test image failed");
}

fn read_result_image(path: &PathBuf) -> (String, Vec<u8>) {
    let content = fs::read(path).expect("Reading result image failed");
    let header = String::from_utf8_lossy(&content[..content.len().min(16)]).to_string();
    (header, content)
}

#[test]
fn test_compress_and_decompress_ppm() {
    let input_path = get_work_path("roundtrip_input.ppm");
    let artifact_path = get_work_path("roundtrip.vqic");
    let result_path = get_work_path("roundtrip_result.ppm");
    cleanup(&[&input_path, &artifact_path, &result_path]);
    write_test_image(&input_path);

    let mut cli_parser = CLIParser::new();
    let arguments = cli_parser.parse(vec![
        "test",
        input_path.to_str().unwrap(),
        artifact_path.to_str().unwrap(),
        "-q",
        "Low",
        "-t",
        "2",
    ]);
    let report = match compress_image_file(&arguments).expect("Compression failed") {
        Outcome::Completed(report) => report,
        Outcome::Aborted => panic!("Compression without time limit was aborted"),
    };
    assert!(artifact_path.exists(), "Artifact was not created");
    let artifact = fs::read(&artifact_path).unwrap();
    assert_eq!(&artifact[..4], b"VQIC");
    assert_eq!(report.compressed_size, artifact.len() as u64);
    assert!(report.mean_squared_error.is_none());
    assert!(!get_work_path("roundtrip.vqic.partial").exists());

    let arguments = cli_parser.parse(vec![
        "test",
        artifact_path.to_str().unwrap(),
        result_path.to_str().unwrap(),
        "--mode",
        "Decompress",
    ]);
    decompress_artifact_file(&arguments).expect("Decompression failed");
    let (header, content) = read_result_image(&result_path);
    assert!(header.starts_with("P6\n37 21\n255\n"));
    assert_eq!(content.len(), "P6\n37 21\n255\n".len() + IMAGE_WIDTH * IMAGE_HEIGHT * 3);
    cleanup(&[&input_path, &artifact_path, &result_path]);
}

#[test]
fn test_compress_with_preview_and_refinement() {
    let input_path = get_work_path("preview_input.ppm");
    let artifact_path = get_work_path("preview.vqic");
    let preview_path = get_work_path("preview_result.ppm");
    cleanup(&[&input_path, &artifact_path, &preview_path]);
    write_test_image(&input_path);

    let mut cli_parser = CLIParser::new();
    let arguments = cli_parser.parse(vec![
        "test",
        input_path.to_str().unwrap(),
        artifact_path.to_str().unwrap(),
        "--tile_size",
        "2",
        "--initializer",
        "LBGRefine",
        "--preview",
        preview_path.to_str().unwrap(),
    ]);
    let report = match compress_image_file(&arguments).expect("Compression failed") {
        Outcome::Completed(report) => report,
        Outcome::Aborted => panic!("Compression without time limit was aborted"),
    };
    assert!(preview_path.exists(), "Preview was not created");
    assert!(report.mean_squared_error.is_some());
    assert!(report.ratio().is_some_and(|ratio| ratio > 0.0));
    cleanup(&[&input_path, &artifact_path, &preview_path]);
}

#[test]
fn test_missing_input_file_is_reported() {
    let input_path = get_work_path("does_not_exist.ppm");
    let artifact_path = get_work_path("missing.vqic");
    cleanup(&[&input_path, &artifact_path]);

    let mut cli_parser = CLIParser::new();
    let arguments = cli_parser.parse(vec![
        "test",
        input_path.to_str().unwrap(),
        artifact_path.to_str().unwrap(),
    ]);
    assert!(compress_image_file(&arguments).is_err());
    assert!(!artifact_path.exists());
}

#[test]
fn test_cancelled_compression_leaves_no_file() {
    let input_path = get_work_path("cancelled_input.ppm");
    let artifact_path = get_work_path("cancelled.vqic");
    let partial_path = get_work_path("cancelled.vqic.partial");
    let preview_path = get_work_path("cancelled_preview.ppm");
    cleanup(&[&input_path, &artifact_path, &partial_path, &preview_path]);
    write_test_image(&input_path);

    let mut cli_parser = CLIParser::new();
    let arguments = cli_parser.parse(vec![
        "test",
        input_path.to_str().unwrap(),
        artifact_path.to_str().unwrap(),
        "--preview",
        preview_path.to_str().unwrap(),
        "-t",
        "2",
    ]);
    let cancellation = CancellationToken::new();
    cancellation.cancel();
    let outcome = compress_image_file_with_cancellation(&arguments, &cancellation)
        .expect("Cancelled compression must not fail");
    assert!(outcome.is_aborted());
    assert!(!artifact_path.exists(), "Artifact of cancelled run was written");
    assert!(!partial_path.exists(), "Partial file of cancelled run was left");
    assert!(!preview_path.exists(), "Preview of cancelled run was written");
    cleanup(&[&input_path]);
}
