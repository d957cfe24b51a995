use tako_compress::{
    Codec, Codecs, Compressor, Config, Encoding,
    codec::{brotli::BrotliOptions, lzw::BitOrder},
};

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.gzip_level, 5);
    assert_eq!(config.deflate_level, 5);
    assert!(config.deflate_dictionary.is_none());
    assert_eq!(config.brotli, BrotliOptions::default());
    assert_eq!((config.brotli.quality, config.brotli.window), (5, 22));
    assert_eq!(config.lzw.order, BitOrder::Lsb);
    assert_eq!(config.lzw.width, 8);
    assert_eq!(config.buffer_size, 32 * 1024);
    assert_eq!(config.max_idle, 64);
    assert_eq!(config.enabled, Encoding::ALL);
}

#[test]
fn partial_json_document_fills_in_defaults() -> anyhow::Result<()> {
    let config: Config = serde_json::from_str(
        r#"{
            "enabled": ["gzip", "br", "x-compress"],
            "gzip_level": 3,
            "brotli": { "quality": 9 },
            "lzw": { "order": "msb", "width": 7 }
        }"#,
    )?;

    assert_eq!(config.gzip_level, 3);
    assert_eq!(config.deflate_level, 5);
    assert_eq!(config.brotli.quality, 9);
    assert_eq!(config.brotli.window, 22);
    assert_eq!(config.lzw.order, BitOrder::Msb);
    assert_eq!(config.lzw.width, 7);

    let codecs = Codecs::from_config(config)?;
    assert_eq!(codecs.names().collect::<Vec<_>>(), ["gzip", "br", "compress"]);
    match codecs.get("compress") {
        Some(Codec::Lzw(lzw)) => assert_eq!((lzw.order(), lzw.width()), (BitOrder::Msb, 7)),
        other => panic!("unexpected codec {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_encoding_in_document_is_rejected() {
    let result = serde_json::from_str::<Config>(r#"{ "enabled": ["gzip", "identity"] }"#);
    assert!(result.is_err());
}

#[test]
fn invalid_values_fail_at_build_time() {
    let config: Config = serde_json::from_str(r#"{ "deflate_level": 11 }"#).unwrap();
    let err = Codecs::from_config(config).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("deflate"));
}

#[test]
fn encoding_tokens_parse() {
    for encoding in Encoding::ALL {
        assert_eq!(encoding.as_str().parse::<Encoding>().unwrap(), *encoding);
        assert_eq!(encoding.to_string(), encoding.as_str());
    }
    assert_eq!(" X-GZIP ".parse::<Encoding>().unwrap(), Encoding::Gzip);
    assert_eq!("Br".parse::<Encoding>().unwrap(), Encoding::Brotli);
    assert!("identity".parse::<Encoding>().unwrap_err().is_config());
}

#[test]
fn builder_with_dictionary_builds_private_decoder_pool() -> anyhow::Result<()> {
    use std::io::{Read, Write};

    let codecs = Codecs::builder()
        .deflate_dictionary(&b"common words common words"[..])
        .build()?;
    let deflate = codecs.get("deflate").unwrap();

    let mut encoder = deflate.new_encoder(Vec::new())?;
    encoder.write_all(b"common words are cheap with a dictionary")?;
    let compressed = encoder.finish()?;

    let mut out = String::new();
    deflate.new_decoder(&compressed[..])?.read_to_string(&mut out)?;
    assert_eq!(out, "common words are cheap with a dictionary");
    Ok(())
}
