use crate::Error;
use bitstream_io::{BitRead, FromBitStream};

/// A CUESHEET metadata block
///
/// Describes the layout of the original disc for CD images:
/// a media catalog number, lead-in length, and a sequence of
/// track records, each with its own index points.
///
/// Every reserved region in the block is read and discarded,
/// never interpreted; a conformant encoder writes zeroes there
/// but decoders accept any value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cuesheet {
    /// The media catalog number, in ASCII printable characters,
    /// with trailing NUL padding trimmed
    pub catalog_number: String,
    /// The number of lead-in samples
    ///
    /// Meaningful only for CD-DA cuesheets.
    pub lead_in_samples: u64,
    /// Whether the cuesheet corresponds to a Compact Disc
    pub is_cdda: bool,
    /// The cuesheet's tracks
    pub tracks: Vec<CuesheetTrack>,
}

impl Cuesheet {
    /// Defined length of the catalog number field, in bytes
    const CATALOG_LEN: usize = 128;
}

impl FromBitStream for Cuesheet {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let catalog_number: [u8; Self::CATALOG_LEN] = r.read_to()?;
        let lead_in_samples = r.read_to()?;
        let is_cdda = r.read_bit()?;
        // remainder of the flags byte and 258 reserved bytes
        r.skip(7 + 258 * 8)?;
        let track_count: u8 = r.read_to()?;

        Ok(Self {
            catalog_number: String::from_utf8(trim_nulls(&catalog_number).to_vec())?,
            lead_in_samples,
            is_cdda,
            tracks: (0..track_count)
                .map(|_| r.parse())
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

/// A track record in a CUESHEET metadata block
///
/// The lead-out track, when present, is the final record
/// and carries no index points.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CuesheetTrack {
    /// Track offset in samples, relative to the beginning
    /// of the FLAC audio stream
    pub offset_samples: u64,
    /// The track number
    pub number: u8,
    /// The track's ISRC, with trailing NUL padding trimmed
    pub isrc: String,
    /// Whether the track is audio
    pub is_audio: bool,
    /// Whether the track has pre-emphasis
    pub pre_emphasis: bool,
    /// The track's index points
    pub indices: Vec<CuesheetTrackIndex>,
}

impl CuesheetTrack {
    /// Defined length of the ISRC field, in bytes
    const ISRC_LEN: usize = 12;
}

impl FromBitStream for CuesheetTrack {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let offset_samples = r.read_to()?;
        let number = r.read_to()?;
        let isrc: [u8; Self::ISRC_LEN] = r.read_to()?;
        let is_audio = r.read_bit()?;
        let pre_emphasis = r.read_bit()?;
        // remainder of the flags byte and 13 reserved bytes
        r.skip(6 + 13 * 8)?;
        let index_count: u8 = r.read_to()?;

        Ok(Self {
            offset_samples,
            number,
            isrc: String::from_utf8(trim_nulls(&isrc).to_vec())?,
            is_audio,
            pre_emphasis,
            indices: (0..index_count)
                .map(|_| r.parse())
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

/// An index point within a CUESHEET track
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CuesheetTrackIndex {
    /// Offset in samples, relative to the track offset
    pub offset_samples: u64,
    /// The index point number
    pub number: u8,
}

impl FromBitStream for CuesheetTrackIndex {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        let offset_samples = r.read_to()?;
        let number = r.read_to()?;
        // 3 reserved bytes
        r.skip(3 * 8)?;
        Ok(Self {
            offset_samples,
            number,
        })
    }
}

fn trim_nulls(mut s: &[u8]) -> &[u8] {
    while let [rest @ .., 0] = s {
        s = rest;
    }
    s
}
