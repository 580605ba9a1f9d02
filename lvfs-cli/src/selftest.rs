//! Read/write/seek/directory self-test against a registered drive.

use lvfs_core::{DriveRegistry, FsError, OpenMode, ResultCode, SeekOrigin};

/// Text written and read back by the test.
pub const SAMPLE: &[u8] = b"This is a test of the LVGL file system from ESP32 LittleFS.";

/// Room for one directory entry name, terminator included.
const NAME_BUF_LEN: usize = 256;

/// Pass/fail tally printed as the test goes.
#[derive(Default)]
struct Report {
    passed: usize,
    failed: usize,
}

impl Report {
    fn check(&mut self, what: &str, ok: bool) {
        if ok {
            self.passed += 1;
            println!("{} test PASSED.", what);
        } else {
            self.failed += 1;
            println!("{} test FAILED.", what);
        }
    }

    fn fail(&mut self, what: &str, err: &FsError) {
        self.failed += 1;
        println!("{} test FAILED: {} (code {})", what, err, err.code().as_u8());
    }
}

/// Run every step on drive `letter`. Returns true when all steps passed.
pub fn run(registry: &DriveRegistry, letter: char) -> bool {
    let mut report = Report::default();
    let file = format!("{}:test_file.txt", letter);

    println!("\n--- Starting file system test on {}: ---", letter);

    write_step(registry, &file, &mut report);
    read_step(registry, &file, &mut report);
    seek_step(registry, &file, &mut report);
    missing_step(registry, letter, &mut report);
    list_step(registry, letter, &mut report);

    println!(
        "\n--- File system test complete: {} passed, {} failed ---",
        report.passed, report.failed
    );
    report.failed == 0
}

fn write_step(registry: &DriveRegistry, file: &str, report: &mut Report) {
    println!("\nAttempting to write file '{}'...", file);
    let f = match registry.open(file, OpenMode::Write) {
        Ok(f) => f,
        Err(e) => return report.fail("Write", &e),
    };
    match registry.write(f, SAMPLE) {
        Ok(n) => {
            println!("Wrote {} bytes to {}.", n, file);
            report.check("Write", n == SAMPLE.len());
        }
        Err(FsError::Full { written }) => {
            println!("Storage full after {} bytes.", written);
            report.check("Write", false);
        }
        Err(e) => report.fail("Write", &e),
    }
    if let Err(e) = registry.close(f) {
        report.fail("Close", &e);
    }
}

fn read_step(registry: &DriveRegistry, file: &str, report: &mut Report) {
    println!("\nAttempting to read file '{}'...", file);
    let f = match registry.open(file, OpenMode::Read) {
        Ok(f) => f,
        Err(e) => return report.fail("Read", &e),
    };
    let mut buf = vec![0u8; SAMPLE.len() + 1];
    match registry.read(f, &mut buf) {
        Ok(n) => {
            println!(
                "Read {} bytes from {}: \"{}\"",
                n,
                file,
                String::from_utf8_lossy(&buf[..n])
            );
            report.check("Read/write round trip", &buf[..n] == SAMPLE);
        }
        Err(e) => report.fail("Read", &e),
    }
    if let Err(e) = registry.close(f) {
        report.fail("Close", &e);
    }
}

fn seek_step(registry: &DriveRegistry, file: &str, report: &mut Report) {
    println!("\nTesting seek and tell...");
    let f = match registry.open(file, OpenMode::Read) {
        Ok(f) => f,
        Err(e) => return report.fail("Seek/Tell", &e),
    };

    let pos = registry
        .seek(f, 10, SeekOrigin::Start)
        .and_then(|()| registry.tell(f));
    match pos {
        Ok(pos) => {
            println!("After seeking to 10 from start, current position: {}", pos);
            report.check("Seek/Tell", pos == 10);
        }
        Err(e) => report.fail("Seek/Tell", &e),
    }

    let mut partial = [0u8; 19];
    match registry.read(f, &mut partial) {
        Ok(n) => {
            println!(
                "Read from current position: \"{}\"",
                String::from_utf8_lossy(&partial[..n])
            );
            report.check("Read after seek", partial[..n] == SAMPLE[10..10 + 19]);
        }
        Err(e) => report.fail("Read after seek", &e),
    }
    if let Err(e) = registry.close(f) {
        report.fail("Close", &e);
    }
}

fn missing_step(registry: &DriveRegistry, letter: char, report: &mut Report) {
    println!("\nTesting opening a non-existent file...");
    match registry.open(&format!("{}:non_existent_file.txt", letter), OpenMode::Read) {
        Err(e) => {
            println!("Open failed with {} (expected {}).", e.code(), ResultCode::NotFound);
            report.check("Missing file", e.code() == ResultCode::NotFound);
        }
        Ok(f) => {
            println!("Unexpectedly opened non_existent_file.txt.");
            let _ = registry.close(f);
            report.check("Missing file", false);
        }
    }
}

fn list_step(registry: &DriveRegistry, letter: char, report: &mut Report) {
    let root = format!("{}:", letter);
    println!("\nTesting directory listing for '{}'...", root);
    let dir = match registry.dir_open(&root) {
        Ok(dir) => dir,
        Err(e) => return report.fail("Directory listing", &e),
    };

    let mut name = [0u8; NAME_BUF_LEN];
    let mut found = false;
    loop {
        match registry.dir_read(dir, &mut name) {
            Ok(0) => break,
            Ok(len) => {
                let entry = String::from_utf8_lossy(&name[..len]);
                found |= entry == "test_file.txt";
                println!("  - {}", entry);
            }
            Err(e) => {
                report.fail("Directory listing", &e);
                break;
            }
        }
    }
    if let Err(e) = registry.dir_close(dir) {
        report.fail("Directory close", &e);
    }
    report.check("Directory listing", found);
}
