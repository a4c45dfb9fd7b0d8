use std::error::Error as _;

use pzip_core::PzipError;

#[test]
fn converts_io_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: PzipError = io_error.into();

    match error {
        PzipError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn converts_anyhow_error() {
    let anyhow_error = anyhow::anyhow!("boom");
    let error: PzipError = anyhow_error.into();

    match error {
        PzipError::Other(err) => assert_eq!(err.to_string(), "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn attaches_context() {
    let err = PzipError::Usage("no input files given").with_context("while parsing arguments");

    match err {
        PzipError::Context { context, source } => {
            assert_eq!(context, "while parsing arguments");
            assert!(matches!(*source, PzipError::Usage("no input files given")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn nested_context_renders_chain_and_keeps_root() {
    let err = PzipError::Allocation { bytes: 4096 }
        .with_context("encoding chunk 3")
        .with_context("encoding 'big.bin'");

    let rendered = err.to_string();
    assert!(rendered.starts_with("encoding 'big.bin': encoding chunk 3:"));
    assert!(matches!(err.root(), PzipError::Allocation { bytes: 4096 }));
    assert!(err.source().is_some());
}
