// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For reading a FLAC stream's metadata blocks
//!
//! Many items are capitalized simply because they were capitalized
//! in the original FLAC format documentation.
//!
//! # Metadata Blocks
//!
//! FLAC defines seven metadata block types
//!
//! | Block Type | Purpose |
//! |-----------:|---------|
//! | [STREAMINFO](`Streaminfo`) | stream information such as sample rate, channel count, etc. |
//! | PADDING | empty data which can easily be resized as needed |
//! | [APPLICATION](`Application`) | application-specific data such as foreign RIFF WAVE chunks |
//! | [SEEKTABLE](`SeekTable`) | to allow for more efficient seeking within a FLAC file |
//! | [VORBIS_COMMENT](`VorbisComment`) | textual metadata such as track title, artist name, album name, etc. |
//! | [CUESHEET](`Cuesheet`) | the original disc's layout, for CD images |
//! | [PICTURE](`Picture`) | embedded image files such as cover art |
//!
//! PADDING payloads, along with those of reserved or invalid block
//! types, are skipped by length and carry no decoded record.

use crate::{Error, ErrorKind};
use bitstream_io::{
    BigEndian, BitRead, BitReader, FromBitStream, FromBitStreamUsing, FromBitStreamWith,
    LittleEndian,
};
use std::fs::File;
use std::io::BufReader;
use std::num::NonZero;
use std::path::Path;

/// Types related to the CUESHEET metadata block
pub mod cuesheet;

pub use cuesheet::{Cuesheet, CuesheetTrack, CuesheetTrackIndex};

const FLAC_TAG: &[u8; 4] = b"fLaC";

/// A FLAC metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in stream |
/// | 7    | `block_type` | type of block |
/// | 24   | `size` | block size, in bytes |
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use flac_metadata::metadata::{BlockHeader, BlockType};
///
/// let data: &[u8] = &[0b1_0000000, 0x00, 0x00, 0x22];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<BlockHeader>().unwrap(),
///     BlockHeader {
///         last: true,                         // 0b1
///         block_type: BlockType::Streaminfo,  // 0b0000000
///         size: 0x22u8.into(),                // 0x00, 0x00, 0x22
///     },
/// );
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final block
    pub last: bool,
    /// Our block type
    pub block_type: BlockType,
    /// The size of the payload which follows us, in bytes
    pub size: BlockSize,
}

impl FromBitStream for BlockHeader {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            last: r.read::<1, _>()?,
            block_type: r.parse()?,
            size: r.parse()?,
        })
    }
}

/// A FLAC metadata block type
///
/// Any 7-bit type code is representable, so decoding a block type
/// cannot fail.  Reserved and invalid codes identify blocks whose
/// payloads are skipped by length, which keeps the reader working
/// on streams written by future encoders.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum BlockType {
    /// The STREAMINFO block
    Streaminfo,
    /// The PADDING block
    Padding,
    /// The APPLICATION block
    Application,
    /// The SEEKTABLE block
    SeekTable,
    /// The VORBIS_COMMENT block
    VorbisComment,
    /// The CUESHEET block
    Cuesheet,
    /// The PICTURE block
    Picture,
    /// A reserved block type, in the range 7–126
    Reserved(u8),
    /// The invalid block type, 127
    Invalid,
}

impl BlockType {
    /// Our type code in the block header, from 0 to 127
    pub fn code(&self) -> u8 {
        match self {
            Self::Streaminfo => 0,
            Self::Padding => 1,
            Self::Application => 2,
            Self::SeekTable => 3,
            Self::VorbisComment => 4,
            Self::Cuesheet => 5,
            Self::Picture => 6,
            Self::Reserved(code) => *code,
            Self::Invalid => 127,
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Streaminfo => "STREAMINFO".fmt(f),
            Self::Padding => "PADDING".fmt(f),
            Self::Application => "APPLICATION".fmt(f),
            Self::SeekTable => "SEEKTABLE".fmt(f),
            Self::VorbisComment => "VORBIS_COMMENT".fmt(f),
            Self::Cuesheet => "CUESHEET".fmt(f),
            Self::Picture => "PICTURE".fmt(f),
            Self::Reserved(_) => "RESERVED".fmt(f),
            Self::Invalid => "INVALID".fmt(f),
        }
    }
}

impl FromBitStream for BlockType {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(match r.read::<7, u8>()? {
            0 => Self::Streaminfo,
            1 => Self::Padding,
            2 => Self::Application,
            3 => Self::SeekTable,
            4 => Self::VorbisComment,
            5 => Self::Cuesheet,
            6 => Self::Picture,
            127 => Self::Invalid,
            reserved => Self::Reserved(reserved),
        })
    }
}

/// A 24-bit block size value
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockSize(u32);

impl BlockSize {
    /// Our current value as a u32
    fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromBitStream for BlockSize {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        r.read::<24, _>().map(Self)
    }
}

impl From<u8> for BlockSize {
    fn from(u: u8) -> Self {
        Self(u.into())
    }
}

impl From<u16> for BlockSize {
    fn from(u: u16) -> Self {
        Self(u.into())
    }
}

impl From<BlockSize> for u32 {
    #[inline]
    fn from(size: BlockSize) -> u32 {
        size.0
    }
}

/// A metadata block's decoded payload
///
/// One variant per recognized block type, plus [`Skipped`](Self::Skipped)
/// for payloads that are discarded by length.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Block {
    /// The STREAMINFO block
    Streaminfo(Streaminfo),
    /// The APPLICATION block
    Application(Application),
    /// The SEEKTABLE block
    SeekTable(SeekTable),
    /// The VORBIS_COMMENT block
    VorbisComment(VorbisComment),
    /// The CUESHEET block
    Cuesheet(Cuesheet),
    /// The PICTURE block
    Picture(Picture),
    /// A PADDING, reserved, or invalid block, whose payload
    /// was consumed and discarded
    Skipped,
}

impl FromBitStreamWith<'_> for Block {
    type Context = BlockHeader;
    type Error = Error;

    // parses from reader without header
    fn from_reader<R: BitRead + ?Sized>(
        r: &mut R,
        header: &BlockHeader,
    ) -> Result<Self, Self::Error> {
        match header.block_type {
            BlockType::Streaminfo => Ok(Self::Streaminfo(r.parse()?)),
            BlockType::Application => Ok(Self::Application(r.parse_using(header.size)?)),
            BlockType::SeekTable => Ok(Self::SeekTable(r.parse_using(header.size)?)),
            BlockType::VorbisComment => Ok(Self::VorbisComment(r.parse()?)),
            BlockType::Cuesheet => Ok(Self::Cuesheet(r.parse()?)),
            BlockType::Picture => Ok(Self::Picture(r.parse()?)),
            BlockType::Padding | BlockType::Reserved(_) | BlockType::Invalid => {
                r.skip(header.size.get() * 8)?;
                Ok(Self::Skipped)
            }
        }
    }
}

/// A complete metadata block: header plus decoded payload
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MetadataBlock {
    /// Our block header
    pub header: BlockHeader,
    /// Our decoded payload
    pub data: Block,
}

impl MetadataBlock {
    /// Our block type
    pub fn block_type(&self) -> BlockType {
        self.header.block_type
    }
}

/// A STREAMINFO metadata block
///
/// The only block whose fields are packed at bit granularity
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 16   | `minimum_block_size` | minimum block size, in samples |
/// | 16   | `maximum_block_size` | maximum block size, in samples |
/// | 24   | `minimum_frame_size` | minimum frame size, in bytes (0 = unknown) |
/// | 24   | `maximum_frame_size` | maximum frame size, in bytes (0 = unknown) |
/// | 20   | `sample_rate` | sample rate, in Hz |
/// | 3    | `channels` | channel count − 1 |
/// | 5    | `bits_per_sample` | bits-per-sample − 1 |
/// | 36   | `total_samples` | total samples (0 = unknown) |
/// | 128  | `md5` | MD5 of unencoded audio data |
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Streaminfo {
    /// The minimum block size (in samples) used in the stream
    pub minimum_block_size: u16,
    /// The maximum block size (in samples) used in the stream
    pub maximum_block_size: u16,
    /// The minimum frame size (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub minimum_frame_size: Option<NonZero<u32>>,
    /// The maximum frame size (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub maximum_frame_size: Option<NonZero<u32>>,
    /// Sample rate in Hz
    ///
    /// 0 indicates a non-audio stream.
    pub sample_rate: u32,
    /// Number of channels, from 1 to 8
    ///
    /// Stored in the stream biased by −1.
    pub channels: NonZero<u8>,
    /// Number of bits-per-sample, from 4 to 32
    ///
    /// Stored in the stream biased by −1.
    pub bits_per_sample: NonZero<u8>,
    /// Total number of interchannel samples in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub total_samples: Option<NonZero<u64>>,
    /// MD5 hash of the unencoded audio data
    pub md5: [u8; 16],
}

impl FromBitStream for Streaminfo {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            minimum_block_size: r.read_to()?,
            maximum_block_size: r.read_to()?,
            minimum_frame_size: r.read::<24, _>()?,
            maximum_frame_size: r.read::<24, _>()?,
            sample_rate: r.read::<20, _>()?,
            channels: r.read::<3, _>()?,
            bits_per_sample: r.read::<5, _>()?,
            total_samples: r.read::<36, _>()?,
            // the packed fields above total 144 bits,
            // so this read is byte-aligned again
            md5: r.read_to()?,
        })
    }
}

/// An APPLICATION metadata block
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 32   | `id` | registered application ID |
/// | rest of block | `data` | application-specific data |
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Application {
    /// A registered application ID, 4 ASCII bytes
    pub id: [u8; 4],
    /// Application-specific data
    pub data: Vec<u8>,
}

impl Application {
    const ID_SIZE: u32 = 4;
}

impl FromBitStreamUsing for Application {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        // a block too small to hold its own ID is malformed
        let data_len = size
            .get()
            .checked_sub(Self::ID_SIZE)
            .ok_or(Error::MalformedLength)?;

        Ok(Self {
            id: r.read_to()?,
            data: r.read_to_vec(data_len.try_into().unwrap())?,
        })
    }
}

/// A SEEKTABLE metadata block
///
/// Maps sample numbers to byte offsets for random access
/// within a FLAC file.  The point count is not stored
/// explicitly; it is implied by the block size, which must
/// be an exact multiple of the 18-byte seek point record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SeekTable {
    /// The seek table's individual seek points
    pub points: Vec<SeekPoint>,
}

impl FromBitStreamUsing for SeekTable {
    type Context = BlockSize;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: BlockSize) -> Result<Self, Self::Error> {
        match (size.get() / SeekPoint::SIZE, size.get() % SeekPoint::SIZE) {
            (points, 0) => Ok(Self {
                points: (0..points)
                    .map(|_| r.parse())
                    .collect::<Result<Vec<_>, _>>()?,
            }),
            _ => Err(Error::MalformedLength),
        }
    }
}

/// An individual SEEKTABLE seek point
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 64   | `sample_number` | sample number of first sample in target frame |
/// | 64   | `byte_offset` | offset, in bytes, from first frame to target frame's header |
/// | 16   | `frame_samples` | number of samples in target frame |
///
/// # Example
/// ```
/// use flac_metadata::metadata::SeekPoint;
///
/// let point = SeekPoint {
///     sample_number: SeekPoint::PLACEHOLDER,
///     byte_offset: 0,
///     frame_samples: 0,
/// };
/// assert!(point.is_placeholder());
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SeekPoint {
    /// The sample number of the first sample in the target frame,
    /// or [`PLACEHOLDER`](Self::PLACEHOLDER) for a placeholder point
    pub sample_number: u64,
    /// Offset, in bytes, from the first byte of the first frame header
    /// to the first byte of the target frame's header
    pub byte_offset: u64,
    /// Number of samples in the target frame
    pub frame_samples: u16,
}

impl SeekPoint {
    /// The sample number marking a not-yet-resolved seek point
    pub const PLACEHOLDER: u64 = u64::MAX;

    /// Size of a seek point record, in bytes
    const SIZE: u32 = (64 + 64 + 16) / 8;

    /// Whether we are a placeholder point
    ///
    /// Placeholder points reserve space in the table; their
    /// byte offset and frame sample count are meaningless.
    pub fn is_placeholder(&self) -> bool {
        self.sample_number == Self::PLACEHOLDER
    }
}

impl FromBitStream for SeekPoint {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            sample_number: r.read_to()?,
            byte_offset: r.read_to()?,
            frame_samples: r.read_to()?,
        })
    }
}

/// A VORBIS_COMMENT metadata block
///
/// Contains metadata such as track name, artist name,
/// album name, etc.  Its contents are UTF-8 encoded,
/// `=`-delimited text fields with a field name followed
/// by a value, such as:
///
/// ```text
/// TITLE=Track Title
/// ```
///
/// This is the only block whose integers are little-endian;
/// everything else in the stream is big-endian.  The vendor
/// string, comment count, and each comment carry their own
/// length prefixes, which are trusted as-is with no
/// cross-check against the block header's size — that is the
/// wire format's own design.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VorbisComment {
    /// The vendor string
    pub vendor_string: String,
    /// The individual metadata comment strings
    pub comments: Vec<String>,
}

impl VorbisComment {
    /// Given a field name, returns the first matching value, if any
    ///
    /// Fields are matched case-insensitively
    ///
    /// # Example
    ///
    /// ```
    /// use flac_metadata::metadata::VorbisComment;
    ///
    /// let comment = VorbisComment {
    ///     vendor_string: "reference libFLAC 1.4.3".to_owned(),
    ///     comments: vec![
    ///         "TITLE=Test".to_owned(),
    ///         "ARTIST=X".to_owned(),
    ///     ],
    /// };
    ///
    /// assert_eq!(comment.get("title"), Some("Test"));
    /// assert_eq!(comment.get("ALBUM"), None);
    /// ```
    pub fn get(&self, field: &str) -> Option<&str> {
        self.comments.iter().find_map(|comment| {
            let (name, value) = comment.split_once('=')?;
            name.eq_ignore_ascii_case(field).then_some(value)
        })
    }
}

impl FromBitStream for VorbisComment {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        fn read_string<R: BitRead + ?Sized>(r: &mut R) -> Result<String, Error> {
            let size = r.read_as_to::<LittleEndian, u32>()?.try_into().unwrap();
            Ok(String::from_utf8(r.read_to_vec(size)?)?)
        }

        Ok(Self {
            vendor_string: read_string(r)?,
            comments: (0..r.read_as_to::<LittleEndian, u32>()?)
                .map(|_| read_string(r))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

/// A PICTURE metadata block
///
/// Stores pictures associated with the file, such as cover art.
/// As with [`VorbisComment`], the string and data fields carry
/// their own length prefixes and are not cross-checked against
/// the block header's size.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Picture {
    /// The picture type
    pub picture_type: PictureType,
    /// The media type string as specified by RFC 2046,
    /// in printable ASCII 0x20–0x7E, or the literal `-->`
    /// to signify that `data` holds a URL of the picture
    pub media_type: String,
    /// The description of the picture, in UTF-8
    pub description: String,
    /// The width of the picture in pixels
    pub width: u32,
    /// The height of the picture in pixels
    pub height: u32,
    /// The color depth of the picture in bits-per-pixel
    pub color_depth: u32,
    /// For indexed-color pictures, the number of colors used.
    ///
    /// `None` for non-indexed pictures.
    pub colors_used: Option<NonZero<u32>>,
    /// The binary picture data, or a picture URL
    pub data: Vec<u8>,
}

impl Picture {
    /// Whether our data is a URL of the picture
    /// rather than the picture itself
    pub fn is_url(&self) -> bool {
        self.media_type == "-->"
    }
}

impl FromBitStream for Picture {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Error> {
        fn prefixed_field<R: BitRead + ?Sized>(r: &mut R) -> std::io::Result<Vec<u8>> {
            let size = r.read_to::<u32>()?;
            r.read_to_vec(size.try_into().unwrap())
        }

        Ok(Self {
            picture_type: r.parse()?,
            media_type: String::from_utf8(prefixed_field(r)?)?,
            description: String::from_utf8(prefixed_field(r)?)?,
            width: r.read_to()?,
            height: r.read_to()?,
            color_depth: r.read_to()?,
            colors_used: r.read::<32, _>()?,
            data: prefixed_field(r)?,
        })
    }
}

/// Defined variants of PICTURE type, per the ID3v2 APIC frame
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PictureType {
    /// Other
    Other,
    /// PNG file icon of 32x32 pixels
    Png32x32,
    /// General file icon
    GeneralFileIcon,
    /// Front cover
    FrontCover,
    /// Back cover
    BackCover,
    /// Liner notes page
    LinerNotes,
    /// Media label (e.g., CD, Vinyl or Cassette label)
    MediaLabel,
    /// Lead artist, lead performer, or soloist
    LeadArtist,
    /// Artist or performer
    Artist,
    /// Conductor
    Conductor,
    /// Band or orchestra
    Band,
    /// Composer
    Composer,
    /// Lyricist or text writer
    Lyricist,
    /// Recording location
    RecordingLocation,
    /// During recording
    DuringRecording,
    /// During performance
    DuringPerformance,
    /// Movie or video screen capture
    ScreenCapture,
    /// A bright colored fish
    Fish,
    /// Illustration
    Illustration,
    /// Band or artist logotype
    BandLogo,
    /// Publisher or studio logotype
    PublisherLogo,
    /// A reserved picture type, 21 or higher
    Reserved(u32),
}

impl PictureType {
    /// Our type code in the stream
    pub fn code(&self) -> u32 {
        match self {
            Self::Other => 0,
            Self::Png32x32 => 1,
            Self::GeneralFileIcon => 2,
            Self::FrontCover => 3,
            Self::BackCover => 4,
            Self::LinerNotes => 5,
            Self::MediaLabel => 6,
            Self::LeadArtist => 7,
            Self::Artist => 8,
            Self::Conductor => 9,
            Self::Band => 10,
            Self::Composer => 11,
            Self::Lyricist => 12,
            Self::RecordingLocation => 13,
            Self::DuringRecording => 14,
            Self::DuringPerformance => 15,
            Self::ScreenCapture => 16,
            Self::Fish => 17,
            Self::Illustration => 18,
            Self::BandLogo => 19,
            Self::PublisherLogo => 20,
            Self::Reserved(code) => *code,
        }
    }
}

impl std::fmt::Display for PictureType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Other => "Other".fmt(f),
            Self::Png32x32 => "32×32 PNG Icon".fmt(f),
            Self::GeneralFileIcon => "General File Icon".fmt(f),
            Self::FrontCover => "Cover (front)".fmt(f),
            Self::BackCover => "Cover (back)".fmt(f),
            Self::LinerNotes => "Liner Notes".fmt(f),
            Self::MediaLabel => "Media Label".fmt(f),
            Self::LeadArtist => "Lead Artist".fmt(f),
            Self::Artist => "Artist".fmt(f),
            Self::Conductor => "Conductor".fmt(f),
            Self::Band => "Band or Orchestra".fmt(f),
            Self::Composer => "Composer".fmt(f),
            Self::Lyricist => "Lyricist or Text Writer".fmt(f),
            Self::RecordingLocation => "Recording Location".fmt(f),
            Self::DuringRecording => "During Recording".fmt(f),
            Self::DuringPerformance => "During Performance".fmt(f),
            Self::ScreenCapture => "Movie or Video Screen Capture".fmt(f),
            Self::Fish => "A Bright Colored Fish".fmt(f),
            Self::Illustration => "Illustration".fmt(f),
            Self::BandLogo => "Band or Artist Logotype".fmt(f),
            Self::PublisherLogo => "Publisher or Studio Logotype".fmt(f),
            Self::Reserved(_) => "Reserved".fmt(f),
        }
    }
}

impl FromBitStream for PictureType {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(match r.read_to::<u32>()? {
            0 => Self::Other,
            1 => Self::Png32x32,
            2 => Self::GeneralFileIcon,
            3 => Self::FrontCover,
            4 => Self::BackCover,
            5 => Self::LinerNotes,
            6 => Self::MediaLabel,
            7 => Self::LeadArtist,
            8 => Self::Artist,
            9 => Self::Conductor,
            10 => Self::Band,
            11 => Self::Composer,
            12 => Self::Lyricist,
            13 => Self::RecordingLocation,
            14 => Self::DuringRecording,
            15 => Self::DuringPerformance,
            16 => Self::ScreenCapture,
            17 => Self::Fish,
            18 => Self::Illustration,
            19 => Self::BandLogo,
            20 => Self::PublisherLogo,
            reserved => Self::Reserved(reserved),
        })
    }
}

#[derive(Copy, Clone, Debug)]
enum ReaderState {
    /// The fLaC marker has not been read yet
    NotStarted,
    /// The marker has been verified; blocks remain to be read
    InStream,
    /// The block flagged as last has been returned
    Done,
    /// A read or decode failed; the stream position is unrecoverable
    Failed(ErrorKind),
}

/// A forward-only reader of FLAC metadata blocks
///
/// Verifies the `fLaC` stream marker once, then reads one
/// header-plus-payload block per call.  The reader is dead
/// once it fails or returns the block flagged as last:
/// further calls re-surface the terminal condition without
/// touching the underlying source.
///
/// Holds mutable stream position with no internal
/// synchronization, so sharing a reader between threads
/// requires external mutual exclusion.
pub struct BlockReader<R: std::io::Read> {
    reader: R,
    state: ReaderState,
}

impl<R: std::io::Read> BlockReader<R> {
    /// Creates a reader over something that implements `Read`.
    ///
    /// Because this may perform many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: ReaderState::NotStarted,
        }
    }

    /// Reads the next metadata block from the stream
    ///
    /// Returns `None` once the block flagged as last has been
    /// returned.  Any failure is terminal: the same error kind
    /// is returned on every subsequent call, without reading
    /// any further from the source.
    ///
    /// # Errors
    ///
    /// Returns any error reading or parsing the marker,
    /// a block header, or a block payload.
    pub fn next_block(&mut self) -> Option<Result<MetadataBlock, Error>> {
        match self.state {
            ReaderState::Done => None,
            ReaderState::Failed(kind) => Some(Err(kind.into())),
            ReaderState::NotStarted => match self.verify_marker() {
                Ok(()) => {
                    self.state = ReaderState::InStream;
                    self.next_block()
                }
                Err(err) => Some(Err(self.fail(err))),
            },
            ReaderState::InStream => match self.read_block() {
                Ok(block) => {
                    if block.header.last {
                        self.state = ReaderState::Done;
                    }
                    Some(Ok(block))
                }
                Err(err) => Some(Err(self.fail(err))),
            },
        }
    }

    fn verify_marker(&mut self) -> Result<(), Error> {
        let mut marker = [0; 4];
        self.reader.read_exact(&mut marker)?;
        (&marker == FLAC_TAG)
            .then_some(())
            .ok_or(Error::InvalidMarker)
    }

    fn read_block(&mut self) -> Result<MetadataBlock, Error> {
        // every payload is a whole number of bytes, so dropping
        // the bit reader between blocks loses no position
        let mut r = BitReader::endian(&mut self.reader, BigEndian);
        let header: BlockHeader = r.parse()?;
        let data: Block = r.parse_with(&header)?;
        Ok(MetadataBlock { header, data })
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = ReaderState::Failed(err.kind());
        err
    }
}

/// Unlike [`BlockReader::next_block`], which re-surfaces a
/// failure on every call, the iterator yields a failure once
/// and then fuses, so collecting into a `Result` works as
/// expected.
impl<R: std::io::Read> Iterator for BlockReader<R> {
    type Item = Result<MetadataBlock, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            // the error was already yielded by the call that failed
            ReaderState::Failed(_) => None,
            _ => self.next_block(),
        }
    }
}

/// Returns a reader of blocks over the given source
///
/// The source should be positioned at the start of the
/// FLAC stream, before the `fLaC` marker.
///
/// # Example
///
/// ```
/// use flac_metadata::metadata::{read_blocks, Application, Block, BlockType};
///
/// let data: &[u8] = &[
///     b'f', b'L', b'a', b'C',  // stream marker
///     0x02, 0x00, 0x00, 0x08,  // APPLICATION block header
///     b'a', b't', b'c', b'h',  // application ID
///     0x01, 0x02, 0x03, 0x04,  // application data
///     0x81, 0x00, 0x00, 0x00,  // empty PADDING block, flagged last
/// ];
///
/// let blocks = read_blocks(data).collect::<Result<Vec<_>, _>>().unwrap();
///
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0].block_type(), BlockType::Application);
/// assert_eq!(
///     blocks[0].data,
///     Block::Application(Application {
///         id: *b"atch",
///         data: vec![0x01, 0x02, 0x03, 0x04],
///     }),
/// );
/// assert_eq!(blocks[1].data, Block::Skipped);
/// ```
pub fn read_blocks<R: std::io::Read>(reader: R) -> BlockReader<R> {
    BlockReader::new(reader)
}

/// Returns a reader of blocks over the given file
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn blocks<P: AsRef<Path>>(path: P) -> Result<BlockReader<BufReader<File>>, Error> {
    File::open(path)
        .map(|file| BlockReader::new(BufReader::new(file)))
        .map_err(Error::from)
}
