use flac_metadata::{Error, ErrorKind};
use flac_metadata::metadata::{Block, BlockReader, BlockType, SeekPoint, read_blocks};

fn block_header(last: bool, block_type: u8, length: u32) -> [u8; 4] {
    [
        (u8::from(last) << 7) | block_type,
        (length >> 16) as u8,
        (length >> 8) as u8,
        length as u8,
    ]
}

// a 34-byte STREAMINFO payload at 44.1 kHz with the
// channel count and bits-per-sample fields still in
// their wire encoding (biased by -1)
fn streaminfo_payload(channels_wire: u8, bps_wire: u8, total_samples: u64) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&4096u16.to_be_bytes()); // minimum block size
    payload.extend_from_slice(&4096u16.to_be_bytes()); // maximum block size
    payload.extend_from_slice(&[0, 0, 0]); // minimum frame size (unknown)
    payload.extend_from_slice(&[0, 0, 0]); // maximum frame size (unknown)
    // 20 bits sample rate, 3 bits channels, 5 bits bits-per-sample,
    // 36 bits total samples
    let packed = (44100u64 << 44)
        | (u64::from(channels_wire) << 41)
        | (u64::from(bps_wire) << 36)
        | total_samples;
    payload.extend_from_slice(&packed.to_be_bytes());
    payload.extend_from_slice(&[0xAA; 16]); // MD5
    payload
}

fn le_string(v: &mut Vec<u8>, s: &str) {
    v.extend_from_slice(&u32::try_from(s.len()).unwrap().to_le_bytes());
    v.extend_from_slice(s.as_bytes());
}

#[test]
fn test_block_accounting() {
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(false, 0, 34));
    flac.extend_from_slice(&streaminfo_payload(1, 15, 88200));
    flac.extend_from_slice(&block_header(false, 2, 4));
    flac.extend_from_slice(b"atch");
    flac.extend_from_slice(&block_header(true, 1, 8));
    flac.extend_from_slice(&[0; 8]);

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    // one block per header written, and only the final one flagged last
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks.iter().filter(|b| b.header.last).count(), 1);
    assert!(blocks[2].header.last);

    assert_eq!(blocks[0].block_type(), BlockType::Streaminfo);
    assert_eq!(blocks[1].block_type(), BlockType::Application);
    assert_eq!(blocks[2].block_type(), BlockType::Padding);
    assert_eq!(blocks[2].data, Block::Skipped);

    // the reader is done, not failed
    let mut reader = read_blocks(flac.as_slice());
    for _ in 0..3 {
        assert!(matches!(reader.next_block(), Some(Ok(_))));
    }
    assert!(reader.next_block().is_none());
    assert!(reader.next_block().is_none());
}

#[test]
fn test_streaminfo_bias_fields() {
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 0, 34));
    flac.extend_from_slice(&streaminfo_payload(1, 15, 88200));

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Streaminfo(s) => {
            assert_eq!(s.minimum_block_size, 4096);
            assert_eq!(s.maximum_block_size, 4096);
            assert_eq!(s.minimum_frame_size, None);
            assert_eq!(s.maximum_frame_size, None);
            assert_eq!(s.sample_rate, 44100);
            // wire value 1 means 2 channels
            assert_eq!(s.channels.get(), 2);
            // wire value 15 means 16 bits-per-sample
            assert_eq!(s.bits_per_sample.get(), 16);
            assert_eq!(s.total_samples.map(|s| s.get()), Some(88200));
            assert_eq!(s.md5, [0xAA; 16]);
        }
        data => panic!("expected STREAMINFO, got {data:?}"),
    }

    // the minimum wire values decode to 1 channel, 1 bit-per-sample,
    // and an unknown number of total samples
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 0, 34));
    flac.extend_from_slice(&streaminfo_payload(0, 0, 0));

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Streaminfo(s) => {
            assert_eq!(s.channels.get(), 1);
            assert_eq!(s.bits_per_sample.get(), 1);
            assert_eq!(s.total_samples, None);
        }
        data => panic!("expected STREAMINFO, got {data:?}"),
    }
}

#[test]
fn test_invalid_marker() {
    // close, but not the exact marker
    let mut data = std::io::Cursor::new(b"flaC\x81\x00\x00\x00".to_vec());
    let mut reader = BlockReader::new(&mut data);

    assert!(matches!(
        reader.next_block(),
        Some(Err(Error::InvalidMarker))
    ));

    // the failure is sticky
    assert!(matches!(
        reader.next_block(),
        Some(Err(Error::InvalidMarker))
    ));

    // nothing past the marker was consumed
    drop(reader);
    assert_eq!(data.position(), 4);
}

#[test]
fn test_seektable() {
    // a block length that is not a multiple of the
    // 18-byte seek point record is malformed
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 3, 19));
    flac.extend_from_slice(&[0; 19]);

    let mut reader = read_blocks(flac.as_slice());
    assert!(matches!(reader.next(), Some(Err(Error::MalformedLength))));
    // the iterator fuses after yielding the failure
    assert!(reader.next().is_none());

    // two points, the second a placeholder
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 3, 36));
    flac.extend_from_slice(&0u64.to_be_bytes());
    flac.extend_from_slice(&0u64.to_be_bytes());
    flac.extend_from_slice(&4096u16.to_be_bytes());
    flac.extend_from_slice(&u64::MAX.to_be_bytes());
    flac.extend_from_slice(&0u64.to_be_bytes());
    flac.extend_from_slice(&0u16.to_be_bytes());

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::SeekTable(table) => {
            assert_eq!(
                table.points,
                vec![
                    SeekPoint {
                        sample_number: 0,
                        byte_offset: 0,
                        frame_samples: 4096,
                    },
                    SeekPoint {
                        sample_number: SeekPoint::PLACEHOLDER,
                        byte_offset: 0,
                        frame_samples: 0,
                    },
                ],
            );
            assert!(!table.points[0].is_placeholder());
            assert!(table.points[1].is_placeholder());
        }
        data => panic!("expected SEEKTABLE, got {data:?}"),
    }
}

#[test]
fn test_application() {
    // a declared length of exactly 4 leaves no data bytes
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 2, 4));
    flac.extend_from_slice(b"riff");

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Application(app) => {
            assert_eq!(app.id, *b"riff");
            assert_eq!(app.data, Vec::<u8>::new());
        }
        data => panic!("expected APPLICATION, got {data:?}"),
    }

    // a declared length too small to hold the ID is malformed
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 2, 3));
    flac.extend_from_slice(b"rif");

    let mut reader = read_blocks(flac.as_slice());
    assert!(matches!(reader.next(), Some(Err(Error::MalformedLength))));
}

#[test]
fn test_reserved_block_skipped() {
    // a reserved block type contributes no record, but its
    // payload must still be advanced past so the following
    // block decodes correctly
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(false, 42, 10));
    flac.extend_from_slice(&[0xFF; 10]);
    flac.extend_from_slice(&block_header(true, 0, 34));
    flac.extend_from_slice(&streaminfo_payload(1, 15, 88200));

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].block_type(), BlockType::Reserved(42));
    assert_eq!(blocks[0].data, Block::Skipped);
    assert!(matches!(&blocks[1].data, Block::Streaminfo(s) if s.sample_rate == 44100));

    assert_eq!(
        blocks
            .iter()
            .filter(|b| b.data != Block::Skipped)
            .count(),
        1,
    );
}

#[test]
fn test_truncated_payload() {
    // STREAMINFO declared at its full 34 bytes,
    // but the stream ends after 20
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(true, 0, 34));
    flac.extend_from_slice(&streaminfo_payload(1, 15, 88200)[..20]);

    let mut reader = read_blocks(flac.as_slice());
    let err = match reader.next() {
        Some(Err(err)) => err,
        block => panic!("expected error, got {block:?}"),
    };
    assert!(matches!(err, Error::UnexpectedEndOfStream));

    // further reads re-surface the same kind
    assert!(matches!(
        reader.next_block(),
        Some(Err(Error::UnexpectedEndOfStream))
    ));
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
}

#[test]
fn test_vorbis_comment() {
    let mut payload = Vec::new();
    le_string(&mut payload, "ref libFLAC 1.4.2");
    payload.extend_from_slice(&2u32.to_le_bytes());
    le_string(&mut payload, "TITLE=Test");
    le_string(&mut payload, "ARTIST=X");

    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(
        true,
        4,
        u32::try_from(payload.len()).unwrap(),
    ));
    flac.extend_from_slice(&payload);

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::VorbisComment(comment) => {
            assert_eq!(comment.vendor_string, "ref libFLAC 1.4.2");
            assert_eq!(comment.comments, vec!["TITLE=Test", "ARTIST=X"]);
            assert_eq!(comment.get("title"), Some("Test"));
            assert_eq!(comment.get("ARTIST"), Some("X"));
            assert_eq!(comment.get("ALBUM"), None);
        }
        data => panic!("expected VORBIS_COMMENT, got {data:?}"),
    }
}

#[test]
fn test_cuesheet() {
    let mut payload = Vec::new();
    let mut catalog = [0u8; 128];
    catalog[..13].copy_from_slice(b"1234567890123");
    payload.extend_from_slice(&catalog);
    payload.extend_from_slice(&88200u64.to_be_bytes()); // lead-in
    payload.push(0x80); // is CD-DA
    payload.extend_from_slice(&[0xFF; 258]); // reserved, must be ignored
    payload.push(1); // track count

    payload.extend_from_slice(&0u64.to_be_bytes()); // track offset
    payload.push(1); // track number
    payload.extend_from_slice(b"JPA600100001"); // ISRC
    payload.push(0b1100_0000); // audio, pre-emphasis
    payload.extend_from_slice(&[0xEE; 13]); // reserved
    payload.push(2); // index count

    payload.extend_from_slice(&0u64.to_be_bytes()); // index offset
    payload.push(1); // index number
    payload.extend_from_slice(&[0x11; 3]); // reserved

    payload.extend_from_slice(&588u64.to_be_bytes()); // index offset
    payload.push(2); // index number
    payload.extend_from_slice(&[0; 3]); // reserved

    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(
        true,
        5,
        u32::try_from(payload.len()).unwrap(),
    ));
    flac.extend_from_slice(&payload);

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Cuesheet(cuesheet) => {
            assert_eq!(cuesheet.catalog_number, "1234567890123");
            assert_eq!(cuesheet.lead_in_samples, 88200);
            assert!(cuesheet.is_cdda);
            assert_eq!(cuesheet.tracks.len(), 1);

            let track = &cuesheet.tracks[0];
            assert_eq!(track.offset_samples, 0);
            assert_eq!(track.number, 1);
            assert_eq!(track.isrc, "JPA600100001");
            assert!(track.is_audio);
            assert!(track.pre_emphasis);
            assert_eq!(track.indices.len(), 2);
            assert_eq!(track.indices[0].offset_samples, 0);
            assert_eq!(track.indices[0].number, 1);
            assert_eq!(track.indices[1].offset_samples, 588);
            assert_eq!(track.indices[1].number, 2);
        }
        data => panic!("expected CUESHEET, got {data:?}"),
    }
}

#[test]
fn test_picture() {
    use flac_metadata::metadata::PictureType;

    fn be_field(v: &mut Vec<u8>, data: &[u8]) {
        v.extend_from_slice(&u32::try_from(data.len()).unwrap().to_be_bytes());
        v.extend_from_slice(data);
    }

    // a front cover with binary data
    let mut payload = Vec::new();
    payload.extend_from_slice(&3u32.to_be_bytes()); // front cover
    be_field(&mut payload, b"image/png");
    be_field(&mut payload, "front".as_bytes());
    payload.extend_from_slice(&640u32.to_be_bytes()); // width
    payload.extend_from_slice(&480u32.to_be_bytes()); // height
    payload.extend_from_slice(&24u32.to_be_bytes()); // depth
    payload.extend_from_slice(&0u32.to_be_bytes()); // colors (non-indexed)
    be_field(&mut payload, &[0x89, 0x50, 0x4E, 0x47]);

    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(
        true,
        6,
        u32::try_from(payload.len()).unwrap(),
    ));
    flac.extend_from_slice(&payload);

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Picture(picture) => {
            assert_eq!(picture.picture_type, PictureType::FrontCover);
            assert_eq!(picture.media_type, "image/png");
            assert_eq!(picture.description, "front");
            assert_eq!(picture.width, 640);
            assert_eq!(picture.height, 480);
            assert_eq!(picture.color_depth, 24);
            assert_eq!(picture.colors_used, None);
            assert_eq!(picture.data, vec![0x89, 0x50, 0x4E, 0x47]);
            assert!(!picture.is_url());
        }
        data => panic!("expected PICTURE, got {data:?}"),
    }

    // a reserved picture type whose data is a URL
    let mut payload = Vec::new();
    payload.extend_from_slice(&21u32.to_be_bytes());
    be_field(&mut payload, b"-->");
    be_field(&mut payload, b"");
    payload.extend_from_slice(&[0; 16]); // width, height, depth, colors
    be_field(&mut payload, b"http://example.com/cover.png");

    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(
        true,
        6,
        u32::try_from(payload.len()).unwrap(),
    ));
    flac.extend_from_slice(&payload);

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    match &blocks[0].data {
        Block::Picture(picture) => {
            assert_eq!(picture.picture_type, PictureType::Reserved(21));
            assert_eq!(picture.picture_type.code(), 21);
            assert!(picture.is_url());
            assert_eq!(picture.data, b"http://example.com/cover.png");
        }
        data => panic!("expected PICTURE, got {data:?}"),
    }
}

#[test]
fn test_block_type_codes() {
    // the invalid code 127 is skipped by length,
    // just like the reserved range
    let mut flac = b"fLaC".to_vec();
    flac.extend_from_slice(&block_header(false, 127, 2));
    flac.extend_from_slice(&[0xAB, 0xCD]);
    flac.extend_from_slice(&block_header(true, 1, 0));

    let blocks = read_blocks(flac.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].block_type(), BlockType::Invalid);
    assert_eq!(blocks[0].block_type().code(), 127);
    assert_eq!(blocks[0].data, Block::Skipped);
    assert_eq!(blocks[0].block_type().to_string(), "INVALID");
    assert_eq!(BlockType::Reserved(42).to_string(), "RESERVED");
    assert_eq!(BlockType::VorbisComment.to_string(), "VORBIS_COMMENT");
}
