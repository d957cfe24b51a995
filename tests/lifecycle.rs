use std::io::{Read, Write};

use tako_compress::{Codecs, Compressor, codec::Gzip};

#[test]
fn gzip_level_three_output_reads_back_at_level_five() -> anyhow::Result<()> {
    let c = Gzip::new(3)?;
    let mut w = c.new_encoder(Vec::new())?;
    w.write_all(b"123")?;
    w.close()?;
    let buf = w.into_inner();
    assert!(!buf.is_empty());

    let mut out = String::new();
    c.new_decoder(buf.as_slice())?.read_to_string(&mut out)?;
    assert_eq!(out, "123");

    let mut out = String::new();
    Gzip::new(5)?
        .new_decoder(buf.as_slice())?
        .read_to_string(&mut out)?;
    assert_eq!(out, "123");
    Ok(())
}

#[test]
fn encoder_rejects_io_after_close() -> anyhow::Result<()> {
    let codecs = Codecs::builder().build()?;
    for codec in codecs.iter() {
        let mut encoder = codec.new_encoder(Vec::new())?;
        encoder.write_all(b"payload")?;
        encoder.close()?;
        assert!(encoder.is_closed());

        let written = encoder.get_ref().len();
        assert!(encoder.write(b"more").is_err(), "{}", codec.name());
        assert!(encoder.flush().is_err(), "{}", codec.name());
        // A second close does nothing, in particular it emits no second trailer.
        encoder.close()?;
        assert_eq!(encoder.get_ref().len(), written);
    }
    Ok(())
}

#[test]
fn decoder_rejects_reads_after_close() -> anyhow::Result<()> {
    let codecs = Codecs::builder().build()?;
    for codec in codecs.iter() {
        let mut encoder = codec.new_encoder(Vec::new())?;
        encoder.write_all(b"payload")?;
        let compressed = encoder.finish()?;

        let mut decoder = codec.new_decoder(&compressed[..])?;
        let mut first = [0u8; 3];
        decoder.read_exact(&mut first)?;
        decoder.close()?;
        decoder.close()?;

        let err = decoder.read(&mut first).unwrap_err();
        assert!(err.to_string().contains("closed"), "{}: {err}", codec.name());
    }
    Ok(())
}

#[test]
fn close_returns_each_engine_exactly_once() -> anyhow::Result<()> {
    let gzip = Gzip::new(6)?;

    let mut encoder = gzip.new_encoder(Vec::new())?;
    encoder.write_all(b"once")?;
    encoder.close()?;
    encoder.close()?;
    drop(encoder);
    assert_eq!(gzip.pool_stats().idle_encoders, 1);

    // Both borrowers must get distinct engines; the pool only ever held one.
    let a = gzip.new_encoder(Vec::new())?;
    let b = gzip.new_encoder(Vec::new())?;
    assert_eq!(gzip.pool_stats().idle_encoders, 0);
    drop((a, b));
    assert_eq!(gzip.pool_stats().idle_encoders, 2);
    Ok(())
}

#[test]
fn engines_are_reused_across_streams() -> anyhow::Result<()> {
    let gzip = Gzip::new(6)?;
    for round in 0..10 {
        let payload = format!("round {round}");
        let compressed = {
            let mut encoder = gzip.new_encoder(Vec::new())?;
            encoder.write_all(payload.as_bytes())?;
            encoder.finish()?
        };
        let mut out = String::new();
        gzip.new_decoder(&compressed[..])?.read_to_string(&mut out)?;
        assert_eq!(out, payload);
    }
    let stats = gzip.pool_stats();
    assert_eq!((stats.idle_encoders, stats.idle_decoders), (1, 1));
    Ok(())
}

#[test]
fn dropping_an_open_encoder_does_not_finish_the_stream() -> anyhow::Result<()> {
    let gzip = Gzip::new(6)?;
    let mut sink = Vec::new();
    {
        let mut encoder = gzip.new_encoder(&mut sink)?;
        encoder.write_all(b"never finished")?;
    }

    let mut out = Vec::new();
    let err = gzip
        .new_decoder(sink.as_slice())?
        .read_to_end(&mut out)
        .unwrap_err();
    // flate2 reports a missing gzip trailer as corrupt data.
    assert!(
        matches!(
            err.kind(),
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
        ),
        "{err}"
    );
    Ok(())
}
