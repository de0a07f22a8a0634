//! Command-line tests for the `tile` and `check` subcommands.

mod common;

use common::*;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tilescan::fastj::{parse_records, read_records};

// =============================================================================
// Helper functions
// =============================================================================

fn run_tilescan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tilescan"))
        .args(args)
        .output()
        .expect("Failed to run tilescan")
}

fn run_tilescan_with_stdin(args: &[&str], stdin_content: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tilescan"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn tilescan");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(stdin_content.as_bytes()).unwrap();
    }

    child.wait_with_output().expect("Failed to wait for tilescan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

struct Fixture {
    reference: Vec<u8>,
    library: tempfile::NamedTempFile,
    fasta: tempfile::NamedTempFile,
    diff: String,
}

fn fixture() -> Fixture {
    let reference = random_reference(300, 21);
    let library = temp_file(library_fastj(&reference, 0, &[0, 100, 200], 300, 5).as_bytes());
    let fasta = temp_file(fasta(&reference).as_bytes());
    let mut diff = DiffBuilder::new(&reference);
    let alt = if reference[50] == b'g' { "t" } else { "g" };
    let same = diff.reference_at(50, 1);
    diff.variant("SNP", 50, 1, &same, alt).reference_to(300);
    let diff = diff.text.clone();
    Fixture {
        reference,
        library,
        fasta,
        diff,
    }
}

// =============================================================================
// tile
// =============================================================================

#[test]
fn test_tile_from_stdin_to_stdout() {
    let fx = fixture();
    let output = run_tilescan_with_stdin(
        &[
            "tile",
            "-l",
            fx.library.path().to_str().unwrap(),
            "-r",
            fx.fasta.path().to_str().unwrap(),
            "--tag-length",
            "5",
            "-a",
            "sample-1",
            "--stats",
        ],
        &fx.diff,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Tile stats: Paths: 1 (0 failed)"));

    let records = parse_records(&stdout(&output)).unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].header.tile_id, "000.00.0000.000");
    assert_eq!(records[0].header.notes[0], "sample-1");
    assert_eq!(
        records[0].seq.to_ascii_lowercase(),
        fx.reference[..105].to_vec()
    );

    let b0 = records
        .iter()
        .find(|r| r.header.tile_id == "000.00.0000.001")
        .unwrap();
    assert_ne!(b0.seq[50], fx.reference[50]);
}

#[test]
fn test_tile_gzip_output_then_check() {
    let fx = fixture();
    let dir = tempfile::tempdir().unwrap();
    let diff = temp_file(fx.diff.as_bytes());
    let out = dir.path().join("tiles.fj.gz");

    let output = run_tilescan(&[
        "tile",
        "-l",
        fx.library.path().to_str().unwrap(),
        "-r",
        fx.fasta.path().to_str().unwrap(),
        "-i",
        diff.path().to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--tag-length",
        "5",
        "-P",
        "heta",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let records = read_records(&out).unwrap();
    assert_eq!(records.len(), 6);
    assert!(records[0]
        .header
        .notes
        .iter()
        .any(|n| n == "Phase (HETA) A"));

    let check = run_tilescan(&[
        "check",
        "-i",
        out.to_str().unwrap(),
        "--tag-length",
        "5",
        "--stats",
    ]);
    assert!(check.status.success(), "stderr: {}", stderr(&check));
    assert!(stderr(&check).contains("Check stats: Records: 6, Streams: 2"));
}

#[test]
fn test_fill_no_call_with_ref() {
    let fx = fixture();
    let output = run_tilescan_with_stdin(
        &[
            "tile",
            "-l",
            fx.library.path().to_str().unwrap(),
            "-r",
            fx.fasta.path().to_str().unwrap(),
            "--tag-length",
            "5",
            "--fill-no-call-with-ref",
        ],
        "",
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let records = parse_records(&stdout(&output)).unwrap();
    assert!(records.iter().all(|r| r.header.nocall_count.is_none()));
    assert_eq!(records[0].seq.to_ascii_lowercase(), fx.reference[..105].to_vec());
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
fn test_unsorted_diff_is_rejected() {
    let fx = fixture();
    let diff = "chr1\tCGI\tREF\t100\t120\t.\t+\t.\t.\nchr1\tCGI\tREF\t1\t50\t.\t+\t.\t.\n";
    let output = run_tilescan_with_stdin(
        &[
            "tile",
            "-l",
            fx.library.path().to_str().unwrap(),
            "-r",
            fx.fasta.path().to_str().unwrap(),
            "--tag-length",
            "5",
        ],
        diff,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error:"));
    assert!(stderr(&output).contains("not sorted"));
}

#[test]
fn test_invalid_policy_is_rejected() {
    let fx = fixture();
    let output = run_tilescan(&[
        "tile",
        "-l",
        fx.library.path().to_str().unwrap(),
        "-r",
        fx.fasta.path().to_str().unwrap(),
        "-P",
        "bogus",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown variant policy"));
}

#[test]
fn test_library_tag_spacing_is_rejected() {
    let fx = fixture();
    let diff = temp_file(fx.diff.as_bytes());
    let output = run_tilescan(&[
        "tile",
        "-l",
        fx.library.path().to_str().unwrap(),
        "-r",
        fx.fasta.path().to_str().unwrap(),
        "-i",
        diff.path().to_str().unwrap(),
        "--tag-length",
        "150",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error: Invalid format"));
}

#[test]
fn test_malformed_record_on_other_chromosome_is_skipped() {
    let fx = fixture();
    let diff = format!(
        "{}chr2\tCGI\tMNP\t5\t6\t.\t+\t.\talleles AA;ref_allele CC\n",
        fx.diff
    );
    let output = run_tilescan_with_stdin(
        &[
            "tile",
            "-l",
            fx.library.path().to_str().unwrap(),
            "-r",
            fx.fasta.path().to_str().unwrap(),
            "--tag-length",
            "5",
            "--stats",
        ],
        &diff,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Tile stats: Paths: 1 (0 failed)"));
    assert_eq!(parse_records(&stdout(&output)).unwrap().len(), 6);
}

#[test]
fn test_check_detects_corruption() {
    let fx = fixture();
    let output = run_tilescan_with_stdin(
        &[
            "tile",
            "-l",
            fx.library.path().to_str().unwrap(),
            "-r",
            fx.fasta.path().to_str().unwrap(),
            "--tag-length",
            "5",
        ],
        &fx.diff,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let corrupted = stdout(&output).replacen("\"n\":105", "\"n\":104", 1);
    let check = run_tilescan_with_stdin(&["check", "--tag-length", "5"], &corrupted);
    assert!(!check.status.success());
    assert!(stderr(&check).contains("Malformed tile"));
}
