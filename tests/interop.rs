use std::io::{Read, Write};

use bytes::Bytes;
use tako_compress::{
    Compressor,
    codec::{
        Brotli, Deflate, Gzip, Lzw,
        brotli::BrotliOptions,
        lzw::BitOrder,
    },
};

const PAYLOAD: &[u8] = b"interoperability means any configuration reads any other's output";

fn encode(codec: &impl Compressor, data: &[u8]) -> Vec<u8> {
    let mut encoder = codec.new_encoder(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn decode(codec: &impl Compressor, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = codec.new_decoder(data)?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn gzip_levels_interoperate() {
    for (a, b) in [(0, 9), (1, 5), (3, 5), (9, 1)] {
        let writer = Gzip::new(a).unwrap();
        let reader = Gzip::new(b).unwrap();
        assert_eq!(decode(&reader, &encode(&writer, PAYLOAD)).unwrap(), PAYLOAD);
    }
}

#[test]
fn deflate_levels_interoperate() {
    let writer = Deflate::new(1, None).unwrap();
    let reader = Deflate::new(9, None).unwrap();
    assert_eq!(decode(&reader, &encode(&writer, PAYLOAD)).unwrap(), PAYLOAD);
}

#[test]
fn brotli_options_interoperate() {
    let writer = Brotli::new(BrotliOptions::default().quality(11).window(24)).unwrap();
    let reader = Brotli::new(BrotliOptions::default().quality(0).window(10)).unwrap();
    assert_eq!(decode(&reader, &encode(&writer, PAYLOAD)).unwrap(), PAYLOAD);
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_levels_interoperate() {
    use tako_compress::codec::Zstd;

    let writer = Zstd::with_level(19).unwrap();
    let reader = Zstd::new().unwrap();
    assert_eq!(decode(&reader, &encode(&writer, PAYLOAD)).unwrap(), PAYLOAD);
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_reads_concatenated_frames() {
    use tako_compress::codec::Zstd;

    let zstd = Zstd::new().unwrap();
    let mut stream = encode(&zstd, b"first ");
    stream.extend(encode(&zstd, b"second"));
    assert_eq!(decode(&zstd, &stream).unwrap(), b"first second");
}

#[test]
fn deflate_dictionary_must_match() {
    let dict = Bytes::from_static(b"interoperability configuration");
    let with_dict = Deflate::new(6, Some(dict.clone())).unwrap();
    let compressed = encode(&with_dict, PAYLOAD);

    let same_dict = Deflate::new(2, Some(dict)).unwrap();
    assert_eq!(decode(&same_dict, &compressed).unwrap(), PAYLOAD);

    let no_dict = Deflate::new(6, None).unwrap();
    let result = decode(&no_dict, &compressed);
    assert!(result.map(|out| out != PAYLOAD).unwrap_or(true));
}

#[test]
fn empty_dictionary_is_no_dictionary() {
    let empty = Deflate::new(6, Some(Bytes::new())).unwrap();
    assert!(empty.dictionary().is_none());
    let plain = Deflate::new(6, None).unwrap();
    assert_eq!(decode(&plain, &encode(&empty, PAYLOAD)).unwrap(), PAYLOAD);
}

/// LZW carries neither bit order nor width in the stream, so readers with
/// other parameters are not expected to recover the payload.
#[test]
fn lzw_parameter_sets_do_not_interoperate() {
    let writer = Lzw::new(BitOrder::Lsb, 8).unwrap();
    let compressed = encode(&writer, PAYLOAD);

    let reader = Lzw::new(BitOrder::Msb, 5).unwrap();
    let result = match reader.new_decoder(&compressed[..]) {
        Ok(mut decoder) => {
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map(|_| out)
        }
        Err(err) => Err(err.into()),
    };
    assert!(result.map(|out| out != PAYLOAD).unwrap_or(true));

    let matching = Lzw::new(BitOrder::Lsb, 8).unwrap();
    assert_eq!(decode(&matching, &compressed).unwrap(), PAYLOAD);
}
