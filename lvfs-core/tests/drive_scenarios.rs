//! End-to-end scenarios through the drive registry, run against both flash
//! backends.

use lvfs_core::flash::FILE_MAX;
use lvfs_core::{
    DriveRegistry, FlashDriver, FsError, HostFlash, MemFlash, OpenMode, ResultCode, SeekOrigin,
};

const SENTENCE: &[u8] = b"This is a test of the LVGL file system from ESP32 LittleFS.";

fn memory_registry() -> DriveRegistry {
    let reg = DriveRegistry::new();
    reg.register('S', FlashDriver::mount(MemFlash::new()).unwrap())
        .unwrap();
    reg
}

fn host_registry(dir: &tempfile::TempDir) -> DriveRegistry {
    let reg = DriveRegistry::new();
    reg.register('S', FlashDriver::mount(HostFlash::new(dir.path())).unwrap())
        .unwrap();
    reg
}

/// The write / read back / seek / missing file / listing sequence.
fn run_harness(reg: &DriveRegistry) {
    // Write
    let f = reg.open("S:test_file.txt", OpenMode::Write).unwrap();
    assert_eq!(reg.write(f, SENTENCE).unwrap(), SENTENCE.len());
    reg.close(f).unwrap();

    // Read back
    let f = reg.open("S:test_file.txt", OpenMode::Read).unwrap();
    let mut buf = [0u8; 128];
    let n = reg.read(f, &mut buf).unwrap();
    assert_eq!(&buf[..n], SENTENCE);
    assert_eq!(reg.read(f, &mut buf).unwrap(), 0);
    reg.close(f).unwrap();

    // Seek and tell
    let f = reg.open("S:test_file.txt", OpenMode::Read).unwrap();
    reg.seek(f, 10, SeekOrigin::Start).unwrap();
    assert_eq!(reg.tell(f).unwrap(), 10);
    let mut partial = [0u8; 19];
    assert_eq!(reg.read(f, &mut partial).unwrap(), 19);
    assert_eq!(&partial, &SENTENCE[10..29]);
    assert_eq!(&partial, b"test of the LVGL fi");
    reg.close(f).unwrap();

    // Missing file
    let err = reg.open("S:non_existent_file.txt", OpenMode::Read).unwrap_err();
    assert_eq!(err.code(), ResultCode::NotFound);

    // Listing
    let dir = reg.dir_open("S:").unwrap();
    let mut names = Vec::new();
    let mut name = [0u8; 64];
    loop {
        let len = reg.dir_read(dir, &mut name).unwrap();
        if name[0] == 0 {
            assert_eq!(len, 0);
            break;
        }
        names.push(String::from_utf8(name[..len].to_vec()).unwrap());
    }
    reg.dir_close(dir).unwrap();
    assert_eq!(names, vec!["test_file.txt"]);
}

#[test]
fn test_harness_memory() {
    run_harness(&memory_registry());
}

#[test]
fn test_harness_host() {
    let dir = tempfile::tempdir().unwrap();
    run_harness(&host_registry(&dir));
    assert_eq!(
        std::fs::read(dir.path().join("test_file.txt")).unwrap(),
        SENTENCE
    );
}

#[test]
fn test_round_trip_binary() {
    let reg = memory_registry();
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

    let f = reg.open("S:/blob.bin", OpenMode::Write).unwrap();
    assert_eq!(reg.write(f, &data).unwrap(), data.len());
    reg.close(f).unwrap();

    let f = reg.open("S:blob.bin", OpenMode::Read).unwrap();
    assert_eq!(reg.size(f).unwrap(), 1000);
    assert_eq!(reg.read_to_end(f).unwrap(), data);
    reg.close(f).unwrap();
}

#[test]
fn test_close_twice() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        let f = reg.open("S:x", OpenMode::Write).unwrap();
        assert!(reg.close(f).is_ok());
        assert_eq!(reg.close(f).unwrap_err().code(), ResultCode::InvalidHandle);

        let mut buf = [0u8; 1];
        assert_eq!(
            reg.read(f, &mut buf).unwrap_err().code(),
            ResultCode::InvalidHandle
        );
        assert_eq!(
            reg.seek(f, 0, SeekOrigin::Start).unwrap_err().code(),
            ResultCode::InvalidHandle
        );
    }
}

#[test]
fn test_stale_handle_not_aliased() {
    let reg = memory_registry();
    let old = reg.open("S:a", OpenMode::Write).unwrap();
    reg.close(old).unwrap();

    // Likely lands in the same slot.
    let new = reg.open("S:b", OpenMode::Write).unwrap();
    assert_ne!(old, new);
    assert_eq!(
        reg.write(old, b"x").unwrap_err().code(),
        ResultCode::InvalidHandle
    );
    assert_eq!(reg.write(new, b"y").unwrap(), 1);
}

#[test]
fn test_directory_enumeration() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        for name in ["S:a", "S:b"] {
            let f = reg.open(name, OpenMode::Write).unwrap();
            reg.close(f).unwrap();
        }

        let cursor = reg.dir_open("S:").unwrap();
        let mut seen = Vec::new();
        while let Some(name) = reg.dir_next(cursor).unwrap() {
            seen.push(name);
        }
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);

        // End of stream is sticky.
        let mut buf = [0xAAu8; 4];
        assert_eq!(reg.dir_read(cursor, &mut buf).unwrap(), 0);
        assert_eq!(buf[0], 0);
        assert_eq!(reg.dir_next(cursor).unwrap(), None);

        reg.dir_close(cursor).unwrap();
        assert_eq!(
            reg.dir_close(cursor).unwrap_err().code(),
            ResultCode::InvalidHandle
        );
    }
}

#[test]
fn test_dir_open_missing() {
    let reg = memory_registry();
    assert_eq!(
        reg.dir_open("S:nowhere").unwrap_err().code(),
        ResultCode::NotFound
    );
}

#[test]
fn test_full_storage() {
    let reg = DriveRegistry::new();
    reg.register('S', FlashDriver::mount(MemFlash::with_capacity(32)).unwrap())
        .unwrap();

    let f = reg.open("S:fill", OpenMode::Write).unwrap();
    match reg.write(f, SENTENCE) {
        Err(FsError::Full { written }) => assert_eq!(written, 32),
        other => panic!("expected Full, got {:?}", other),
    }
    assert_eq!(reg.tell(f).unwrap(), 32);
    reg.close(f).unwrap();

    let f = reg.open("S:fill", OpenMode::Read).unwrap();
    assert_eq!(reg.read_to_end(f).unwrap(), &SENTENCE[..32]);
}

#[test]
fn test_write_mode_truncates() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        let f = reg.open("S:t", OpenMode::Write).unwrap();
        reg.write(f, b"a long first version").unwrap();
        reg.close(f).unwrap();

        let f = reg.open("S:t", OpenMode::Write).unwrap();
        reg.write(f, b"short").unwrap();
        reg.close(f).unwrap();

        let f = reg.open("S:t", OpenMode::Read).unwrap();
        assert_eq!(reg.read_to_end(f).unwrap(), b"short");
        reg.close(f).unwrap();
    }
}

#[test]
fn test_negative_seek() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        let f = reg.open("S:n", OpenMode::ReadWrite).unwrap();
        reg.write(f, b"abc").unwrap();
        let err = reg.seek(f, -4, SeekOrigin::End).unwrap_err();
        assert!(matches!(err, FsError::InvalidSeek(-1)));
        assert_eq!(reg.tell(f).unwrap(), 3);
        reg.close(f).unwrap();
    }
}

#[test]
fn test_open_directory_as_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let reg = host_registry(&dir);
    assert_eq!(
        reg.open("S:sub", OpenMode::Read).unwrap_err().code(),
        ResultCode::AccessDenied
    );

    let cursor = reg.dir_open("S:").unwrap();
    assert_eq!(reg.dir_next(cursor).unwrap(), Some("/sub".to_string()));
}

#[test]
fn test_missing_below_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        let f = reg.open("S:a.txt", OpenMode::Write).unwrap();
        reg.close(f).unwrap();

        assert_eq!(
            reg.open("S:a.txt/x", OpenMode::Read).unwrap_err().code(),
            ResultCode::NotFound
        );
        assert_eq!(
            reg.dir_open("S:a.txt").unwrap_err().code(),
            ResultCode::NotFound
        );
    }
}

#[test]
fn test_write_beyond_file_limit() {
    let dir = tempfile::tempdir().unwrap();
    for reg in [memory_registry(), host_registry(&dir)] {
        let f = reg.open("S:sparse", OpenMode::ReadWrite).unwrap();
        reg.seek(f, FILE_MAX as i64, SeekOrigin::Start).unwrap();
        assert!(matches!(
            reg.write(f, b"x"),
            Err(FsError::Full { written: 0 })
        ));
        assert_eq!(reg.size(f).unwrap(), 0);
        reg.close(f).unwrap();
    }
}
