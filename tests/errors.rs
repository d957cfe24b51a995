use std::io::{ErrorKind, Read, Write};

use tako_compress::{
    Compressor, Error,
    codec::{Brotli, Deflate, Gzip, Lzw, brotli::BrotliOptions, lzw::BitOrder},
};

fn read_all(codec: &impl Compressor, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = codec.new_decoder(data)?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn gzip_rejects_foreign_sources_up_front() {
    let gzip = Gzip::new(5).unwrap();
    for source in [&b"plain text, not gzip"[..], &[0x1f, 0x8b, 0x07][..], &[][..]] {
        let err = gzip.new_decoder(source).unwrap_err();
        assert!(err.is_decode(), "{source:?}: {err}");
    }
}

#[test]
fn short_gzip_header_is_a_decode_error() {
    let gzip = Gzip::new(5).unwrap();
    let err = gzip.new_decoder(&[0x1f][..]).unwrap_err();
    match err {
        Error::Decode { codec, source } => {
            assert_eq!(codec, "gzip");
            assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_rejects_foreign_sources_up_front() {
    use tako_compress::codec::Zstd;

    let zstd = Zstd::new().unwrap();
    let err = zstd.new_decoder(&b"not a zstd frame"[..]).unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().starts_with("zstd"));
}

#[test]
fn corrupt_deflate_fails_on_read() {
    let deflate = Deflate::new(5, None).unwrap();
    // BTYPE 0b11 is reserved.
    let err = read_all(&deflate, &[0xff; 16]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn truncated_streams_fail_on_read() {
    let payload = b"truncated streams must never look complete".repeat(20);
    let codecs: Vec<tako_compress::Codec> = vec![
        Gzip::new(5).unwrap().into(),
        Deflate::new(5, None).unwrap().into(),
        Brotli::new(BrotliOptions::default()).unwrap().into(),
        Lzw::new(BitOrder::Lsb, 8).unwrap().into(),
    ];

    for codec in &codecs {
        let mut encoder = codec.new_encoder(Vec::new()).unwrap();
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let cut = &compressed[..compressed.len() - 2];
        assert!(read_all(codec, cut).is_err(), "{} accepted a truncated stream", codec.name());
    }
}

#[test]
fn gzip_checksum_is_verified() {
    let gzip = Gzip::new(5).unwrap();
    let mut encoder = gzip.new_encoder(Vec::new()).unwrap();
    encoder.write_all(b"checksummed").unwrap();
    let mut compressed = encoder.finish().unwrap();
    let crc = compressed.len() - 8;
    compressed[crc] ^= 0xff;

    let err = read_all(&gzip, &compressed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn out_of_range_parameters_are_config_errors() {
    assert!(Gzip::new(10).unwrap_err().is_config());
    assert!(Deflate::new(12, None).unwrap_err().is_config());
    assert!(Lzw::new(BitOrder::Lsb, 1).unwrap_err().is_config());
    assert!(Lzw::new(BitOrder::Msb, 9).unwrap_err().is_config());
    assert!(Brotli::new(BrotliOptions::default().quality(12)).unwrap_err().is_config());
    assert!(Brotli::new(BrotliOptions::default().window(9)).unwrap_err().is_config());
    assert!(Brotli::new(BrotliOptions::default().window(25)).unwrap_err().is_config());
    assert!(Brotli::new(BrotliOptions::default().buffer_size(0)).unwrap_err().is_config());
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_level_must_be_supported() {
    use tako_compress::codec::Zstd;

    let err = Zstd::with_level(*zstd::compression_level_range().end() + 1).unwrap_err();
    assert!(err.is_config());
    assert!(Zstd::with_level(1).is_ok());
}

#[test]
fn config_errors_name_the_codec() {
    let err = Gzip::new(42).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid gzip configuration: level 42 is out of range 0..=9"
    );
}

#[test]
fn errors_convert_into_io_errors() {
    let gzip = Gzip::new(5).unwrap();
    let err: std::io::Error = gzip.new_decoder(&b"nope"[..]).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    let err: std::io::Error = Gzip::new(11).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
