//! DMK track format serialization and deserialization
//!
//! A track is a header followed by item records, all little-endian.
//! Strings are a `u32` byte length followed by UTF-8.

use crate::item::{Color, ItemStyle, OverlayItem};
use crate::kind::{Anchor, Direction, ItemKind, Keyframe, KindTag, Motion};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Magic bytes for DMK tracks: "DMK\0"
const MAGIC: [u8; 4] = [b'D', b'M', b'K', 0];

/// Current track format version
const VERSION: u16 = 1;

/// Longest string accepted when reading
const MAX_STRING_LEN: u32 = 1 << 20;

/// Most keyframes or lines accepted for one item
const MAX_ENTRIES: u32 = 1 << 16;

const FLAG_VISIBLE: u8 = 1;
const FLAG_UNDERLINE: u8 = 1 << 1;
const FLAG_LINES: u8 = 1 << 2;
const FLAG_TAG: u8 = 1 << 3;

/// Track file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeader {
    /// Format version
    pub version: u16,
    /// Number of item records
    pub num_items: u32,
    /// End of the last item window at a duration coefficient of 1, ms
    pub duration_ms: u64,
}

impl TrackHeader {
    pub fn new(num_items: u32, duration_ms: u64) -> Self {
        Self {
            version: VERSION,
            num_items,
            duration_ms,
        }
    }

    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let num_items = reader.read_u32::<LittleEndian>()?;
        let duration_ms = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            version,
            num_items,
            duration_ms,
        })
    }

    /// Writes the header to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.num_items)?;
        writer.write_u64::<LittleEndian>(self.duration_ms)?;
        Ok(())
    }
}

/// A complete track: header plus items in pool order
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub header: TrackHeader,
    pub items: Vec<OverlayItem>,
}

impl Track {
    /// Builds a track around `items`, computing the header
    pub fn from_items(items: Vec<OverlayItem>) -> Self {
        let duration_ms = items
            .iter()
            .map(|item| item.offset_ms.saturating_add(item.duration_ms))
            .max()
            .unwrap_or(0);
        Self {
            header: TrackHeader::new(items.len() as u32, duration_ms),
            items,
        }
    }

    /// Reads a track from a reader
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let header = TrackHeader::read(&mut reader)?;

        // Capacity is bounded; the count comes from untrusted input.
        let mut items = Vec::with_capacity(header.num_items.min(4096) as usize);
        for _ in 0..header.num_items {
            items.push(read_item(&mut reader)?);
        }

        Ok(Self { header, items })
    }

    /// Writes the track to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.header.num_items as usize != self.items.len() {
            return Err(Error::InvalidItem(format!(
                "header announces {} items, track holds {}",
                self.header.num_items,
                self.items.len()
            )));
        }
        self.header.write(&mut writer)?;
        for item in &self.items {
            write_item(&mut writer, item)?;
        }
        Ok(())
    }

    /// Items within their window at `timestamp_ms`
    pub fn active_items(&self, timestamp_ms: u64) -> Vec<&OverlayItem> {
        self.items
            .iter()
            .filter(|item| item.is_active(timestamp_ms as f64, 1.0))
            .collect()
    }
}

fn read_item<R: Read>(reader: &mut R) -> Result<OverlayItem> {
    let tag = reader.read_u8()?;
    let kind = match tag {
        t if t == KindTag::Top as u8 => ItemKind::Stationary(Anchor::Top),
        t if t == KindTag::Bottom as u8 => ItemKind::Stationary(Anchor::Bottom),
        t if t == KindTag::RightToLeft as u8 => ItemKind::Moving(Direction::RightToLeft),
        t if t == KindTag::LeftToRight as u8 => ItemKind::Moving(Direction::LeftToRight),
        t if t == KindTag::FreeForm as u8 => ItemKind::FreeForm(Motion {
            begin_x: reader.read_f32::<LittleEndian>()?,
            begin_y: reader.read_f32::<LittleEndian>()?,
            end_x: reader.read_f32::<LittleEndian>()?,
            end_y: reader.read_f32::<LittleEndian>()?,
            begin_alpha: reader.read_u8()?,
            end_alpha: reader.read_u8()?,
            rotation: reader.read_f32::<LittleEndian>()?,
        }),
        t if t == KindTag::Keyframed as u8 => {
            let count = read_count(reader)?;
            let mut frames = Vec::with_capacity(count.min(256) as usize);
            for _ in 0..count {
                frames.push(Keyframe {
                    progress: reader.read_f32::<LittleEndian>()?,
                    x: reader.read_f32::<LittleEndian>()?,
                    y: reader.read_f32::<LittleEndian>()?,
                    rotation: reader.read_f32::<LittleEndian>()?,
                    alpha: reader.read_u8()?,
                });
            }
            ItemKind::Keyframed(frames)
        }
        other => return Err(Error::InvalidKind(other)),
    };

    let offset_ms = reader.read_u64::<LittleEndian>()?;
    let duration_ms = reader.read_u64::<LittleEndian>()?;
    let flags = reader.read_u8()?;
    let style = ItemStyle {
        text_size: reader.read_f32::<LittleEndian>()?,
        color: Color(reader.read_u32::<LittleEndian>()?),
        shadow_color: Color(reader.read_u32::<LittleEndian>()?),
        underline: flags & FLAG_UNDERLINE != 0,
        border_color: Color(reader.read_u32::<LittleEndian>()?),
        alpha: reader.read_u8()?,
    };
    let text = read_string(reader)?;

    let lines = if flags & FLAG_LINES != 0 {
        let count = read_count(reader)?;
        let mut lines = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            lines.push(read_string(reader)?);
        }
        Some(lines)
    } else {
        None
    };
    let tag = if flags & FLAG_TAG != 0 {
        Some(read_string(reader)?)
    } else {
        None
    };

    Ok(OverlayItem {
        text,
        lines,
        style,
        offset_ms,
        duration_ms,
        visible: flags & FLAG_VISIBLE != 0,
        kind,
        tag,
    })
}

fn write_item<W: Write>(writer: &mut W, item: &OverlayItem) -> Result<()> {
    writer.write_u8(item.tag_kind() as u8)?;
    match &item.kind {
        ItemKind::Stationary(_) | ItemKind::Moving(_) => {}
        ItemKind::FreeForm(motion) => {
            writer.write_f32::<LittleEndian>(motion.begin_x)?;
            writer.write_f32::<LittleEndian>(motion.begin_y)?;
            writer.write_f32::<LittleEndian>(motion.end_x)?;
            writer.write_f32::<LittleEndian>(motion.end_y)?;
            writer.write_u8(motion.begin_alpha)?;
            writer.write_u8(motion.end_alpha)?;
            writer.write_f32::<LittleEndian>(motion.rotation)?;
        }
        ItemKind::Keyframed(frames) => {
            write_count(writer, frames.len())?;
            for frame in frames {
                writer.write_f32::<LittleEndian>(frame.progress)?;
                writer.write_f32::<LittleEndian>(frame.x)?;
                writer.write_f32::<LittleEndian>(frame.y)?;
                writer.write_f32::<LittleEndian>(frame.rotation)?;
                writer.write_u8(frame.alpha)?;
            }
        }
    }

    let mut flags = 0;
    if item.visible {
        flags |= FLAG_VISIBLE;
    }
    if item.style.underline {
        flags |= FLAG_UNDERLINE;
    }
    if item.lines.is_some() {
        flags |= FLAG_LINES;
    }
    if item.tag.is_some() {
        flags |= FLAG_TAG;
    }

    writer.write_u64::<LittleEndian>(item.offset_ms)?;
    writer.write_u64::<LittleEndian>(item.duration_ms)?;
    writer.write_u8(flags)?;
    writer.write_f32::<LittleEndian>(item.style.text_size)?;
    writer.write_u32::<LittleEndian>(item.style.color.0)?;
    writer.write_u32::<LittleEndian>(item.style.shadow_color.0)?;
    writer.write_u32::<LittleEndian>(item.style.border_color.0)?;
    writer.write_u8(item.style.alpha)?;
    write_string(writer, &item.text)?;

    if let Some(lines) = &item.lines {
        write_count(writer, lines.len())?;
        for line in lines {
            write_string(writer, line)?;
        }
    }
    if let Some(tag) = &item.tag {
        write_string(writer, tag)?;
    }
    Ok(())
}

fn read_count<R: Read>(reader: &mut R) -> Result<u32> {
    let count = reader.read_u32::<LittleEndian>()?;
    if count > MAX_ENTRIES {
        return Err(Error::InvalidItem(format!("{count} entries exceed the limit")));
    }
    Ok(count)
}

fn write_count<W: Write>(writer: &mut W, count: usize) -> Result<()> {
    if count > MAX_ENTRIES as usize {
        return Err(Error::InvalidItem(format!("{count} entries exceed the limit")));
    }
    writer.write_u32::<LittleEndian>(count as u32)?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(Error::InvalidItem(format!("string of {len} bytes")));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidItem(e.to_string()))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    if value.len() > MAX_STRING_LEN as usize {
        return Err(Error::InvalidItem(format!("string of {} bytes", value.len())));
    }
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_items() -> Vec<OverlayItem> {
        vec![
            OverlayItem::new(ItemKind::Stationary(Anchor::Top), "hello", 0),
            OverlayItem::new(ItemKind::Moving(Direction::LeftToRight), "world", 1500)
                .with_tag("user:42")
                .hidden(),
            OverlayItem::new(
                ItemKind::FreeForm(Motion {
                    begin_x: 10.0,
                    begin_y: 20.0,
                    end_x: 300.0,
                    end_y: 200.0,
                    begin_alpha: 255,
                    end_alpha: 0,
                    rotation: 15.0,
                }),
                "two/nlines",
                2000,
            )
            .with_lines_split_on("/n"),
            OverlayItem::new(
                ItemKind::Keyframed(vec![Keyframe {
                    progress: 0.5,
                    x: 0.25,
                    y: 0.75,
                    rotation: 90.0,
                    alpha: 128,
                }]),
                "kf",
                3000,
            )
            .with_duration(8000)
            .with_style(ItemStyle {
                text_size: 18.0,
                color: Color::rgb(255, 0, 0),
                underline: true,
                border_color: Color::WHITE,
                ..ItemStyle::default()
            }),
        ]
    }

    #[test]
    fn test_header_roundtrip() {
        let header = TrackHeader::new(20, 5000);

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 18);

        let mut cursor = Cursor::new(buffer);
        assert_eq!(TrackHeader::read(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_track_roundtrip() {
        let track = Track::from_items(sample_items());
        assert_eq!(track.header.num_items, 4);
        assert_eq!(track.header.duration_ms, 11_500);

        let mut buffer = Vec::new();
        track.write(&mut buffer).unwrap();

        let read = Track::read(Cursor::new(buffer)).unwrap();
        assert_eq!(read, track);
    }

    #[test]
    fn test_rejects_bad_magic_and_version() {
        let mut buffer = Vec::new();
        TrackHeader::new(0, 0).write(&mut buffer).unwrap();

        let mut bad_magic = buffer.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            Track::read(Cursor::new(bad_magic)),
            Err(Error::InvalidMagic)
        ));

        let mut bad_version = buffer;
        bad_version[4] = 9;
        assert!(matches!(
            Track::read(Cursor::new(bad_version)),
            Err(Error::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_rejects_unknown_kind_and_truncation() {
        let mut buffer = Vec::new();
        TrackHeader::new(1, 0).write(&mut buffer).unwrap();
        buffer.push(42);
        assert!(matches!(
            Track::read(Cursor::new(buffer)),
            Err(Error::InvalidKind(42))
        ));

        let mut buffer = Vec::new();
        Track::from_items(sample_items()).write(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 3);
        assert!(matches!(Track::read(Cursor::new(buffer)), Err(Error::Io(_))));
    }

    #[test]
    fn test_active_items() {
        let track = Track::from_items(sample_items());
        let texts: Vec<_> = track.active_items(1600).iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "world"]);
    }
}
