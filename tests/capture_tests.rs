//! End-to-end capture tests against the simulated backend

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use multicap::application::CaptureService;
use multicap::domain::audio::{WavHeader, WAV_HEADER_SIZE};
use multicap::domain::error::CaptureError;
use multicap::infrastructure::SimulatedBackend;

fn header_of(path: &Path) -> WavHeader {
    let bytes = std::fs::read(path).unwrap();
    WavHeader::decode(&bytes[..WAV_HEADER_SIZE]).unwrap()
}

fn wav_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "wav"))
        .collect();
    files.sort();
    files
}

#[test]
fn three_buffers_make_1792_byte_payload() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let service = CaptureService::new(backend.clone(), dir.path());

    service.start(&[0]).unwrap();
    assert!(backend.feed("Mic", &[0x11; 512]));
    assert!(backend.feed("Mic", &[0x22; 256]));
    assert!(backend.feed("Mic", &[0x33; 1024]));
    let finished = service.stop().unwrap();

    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].payload_bytes, 1792);
    assert!(finished[0].finalized);

    let path = &finished[0].path;
    assert_eq!(header_of(path).payload_size, 1792);
    assert_eq!(header_of(path).total_size(), 1792 + 44);
    assert_eq!(std::fs::metadata(path).unwrap().len(), 1792 + 44);

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(bytes[44], 0x11);
    assert_eq!(bytes[44 + 512], 0x22);
    assert_eq!(bytes[44 + 768], 0x33);
}

#[test]
fn output_is_readable_wav() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let service = CaptureService::new(backend.clone(), dir.path());

    service.start(&[0]).unwrap();
    let samples: Vec<i16> = (0..441).map(|i| (i * 50) as i16).collect();
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    backend.feed("Mic", &bytes);
    let finished = service.stop().unwrap();

    let mut reader = hound::WavReader::open(&finished[0].path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn each_device_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["BlackHole 2ch!", "USB Mic", "Line In"]);
    let service = CaptureService::new(backend.clone(), dir.path());

    let active = service.start(&[2, 0]).unwrap();
    assert_eq!(active[0].device_name, "Line In");
    assert_eq!(active[1].device_name, "BlackHole 2ch!");
    assert_eq!(service.status().devices, vec!["Line In", "BlackHole 2ch!"]);

    backend.feed("Line In", &[1; 100]);
    backend.feed("BlackHole 2ch!", &[2; 300]);
    assert!(!backend.feed("USB Mic", &[3; 10]));
    service.stop().unwrap();

    let files = wav_files(dir.path());
    assert_eq!(files.len(), 2);

    let blackhole = files
        .iter()
        .find(|p| p.to_string_lossy().ends_with("_BlackHole_2ch_.wav"))
        .unwrap();
    let line_in = files
        .iter()
        .find(|p| p.to_string_lossy().ends_with("_Line_In.wav"))
        .unwrap();
    assert_eq!(header_of(blackhole).payload_size, 300);
    assert_eq!(header_of(line_in).payload_size, 100);
}

#[test]
fn concurrent_feeders_are_counted_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["A", "B", "C"]);
    let service = CaptureService::new(backend.clone(), dir.path());
    service.start(&[0, 1, 2]).unwrap();

    let handles: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let backend = backend.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    backend.feed(name, &[7; 64]);
                    thread::yield_now();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for finished in service.stop().unwrap() {
        // Buffers arriving on a full queue are dropped and reported
        assert_eq!(
            finished.payload_bytes + finished.dropped_buffers * 64,
            20 * 64,
            "{}",
            finished.device_name
        );
        assert_eq!(header_of(&finished.path).payload_size as u64, finished.payload_bytes);
    }
}

#[test]
fn second_start_is_rejected_from_another_thread() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic", "Line In"]);
    let service = Arc::new(CaptureService::new(backend, dir.path()));

    service.start(&[0]).unwrap();

    let other = Arc::clone(&service);
    let err = thread::spawn(move || other.start(&[1]))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, CaptureError::AlreadyRecording));
    assert_eq!(service.status().devices, vec!["Mic"]);

    service.stop().unwrap();
    assert_eq!(wav_files(dir.path()).len(), 1);
}

#[test]
fn failed_start_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic", "Line In", "Interface"]);
    backend.fail_start("Interface");
    let service = CaptureService::new(backend.clone(), dir.path());

    let err = service.start(&[0, 1, 2]).unwrap_err();
    assert!(matches!(err, CaptureError::StreamStartFailed { .. }));
    assert!(!service.is_recording());
    assert!(!backend.is_running("Mic"));
    assert!(wav_files(dir.path()).is_empty());

    // The session is usable afterwards
    service.start(&[0]).unwrap();
    service.stop().unwrap();
    assert_eq!(wav_files(dir.path()).len(), 1);
}

#[test]
fn delivered_rate_is_written_to_header() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SimulatedBackend::with_devices(["Mic"]);
    backend.deliver_sample_rate(48_000);
    let service = CaptureService::new(backend.clone(), dir.path());

    service.start(&[0]).unwrap();
    backend.feed("Mic", &[0; 96_000]);
    let finished = service.stop().unwrap();

    let header = header_of(&finished[0].path);
    assert_eq!(header.descriptor.sample_rate, 48_000);
    assert_eq!(header.descriptor.byte_rate(), 96_000);
    assert_eq!(finished[0].duration().as_secs(), 1);
}

#[test]
fn output_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let backend = SimulatedBackend::with_devices(["Mic"]);
    let service = CaptureService::new(backend, &nested);

    service.start(&[0]).unwrap();
    service.stop().unwrap();
    assert_eq!(wav_files(&nested).len(), 1);
}
