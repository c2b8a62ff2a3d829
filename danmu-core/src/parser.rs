//! Item sources
//!
//! A [`Parser`] produces the full item list for a load. Parsing runs on the
//! caller's thread; malformed input is reported through [`Result`].

use crate::item::OverlayItem;
use crate::track::Track;
use crate::Result;
use std::io::Read;
use tracing::debug;

/// Produces the items of a track
pub trait Parser {
    fn parse(&mut self) -> Result<Vec<OverlayItem>>;
}

impl<P: Parser + ?Sized> Parser for Box<P> {
    fn parse(&mut self) -> Result<Vec<OverlayItem>> {
        (**self).parse()
    }
}

/// Parser that yields no items
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyParser;

impl Parser for EmptyParser {
    fn parse(&mut self) -> Result<Vec<OverlayItem>> {
        Ok(Vec::new())
    }
}

/// Parser over items already in memory. Yields them once.
#[derive(Debug, Clone, Default)]
pub struct ItemsParser {
    items: Vec<OverlayItem>,
}

impl ItemsParser {
    pub fn new(items: Vec<OverlayItem>) -> Self {
        Self { items }
    }
}

impl Parser for ItemsParser {
    fn parse(&mut self) -> Result<Vec<OverlayItem>> {
        Ok(std::mem::take(&mut self.items))
    }
}

/// Reads items from a binary DMK track
#[derive(Debug)]
pub struct TrackParser<R> {
    reader: R,
}

impl<R: Read> TrackParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> Parser for TrackParser<R> {
    fn parse(&mut self) -> Result<Vec<OverlayItem>> {
        let track = Track::read(&mut self.reader)?;
        debug!(
            items = track.items.len(),
            duration_ms = track.header.duration_ms,
            "parsed binary track"
        );
        Ok(track.items)
    }
}

/// Reads items from a JSON array
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonParser {
    json: String,
}

#[cfg(feature = "serde")]
impl JsonParser {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Ok(Self { json })
    }
}

#[cfg(feature = "serde")]
impl Parser for JsonParser {
    fn parse(&mut self) -> Result<Vec<OverlayItem>> {
        let items: Vec<OverlayItem> = serde_json::from_str(&self.json)?;
        debug!(items = items.len(), "parsed JSON track");
        Ok(items)
    }
}

/// Serializes items as a pretty-printed JSON array
#[cfg(feature = "serde")]
pub fn to_json(items: &[OverlayItem]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Anchor, Direction, ItemKind};
    use std::io::Cursor;

    #[test]
    fn test_empty_parser() {
        assert!(EmptyParser.parse().unwrap().is_empty());
    }

    #[test]
    fn test_items_parser_yields_once() {
        let mut parser = ItemsParser::new(vec![OverlayItem::new(
            ItemKind::Stationary(Anchor::Top),
            "a",
            0,
        )]);
        assert_eq!(parser.parse().unwrap().len(), 1);
        assert!(parser.parse().unwrap().is_empty());
    }

    #[test]
    fn test_track_parser() {
        let items = vec![
            OverlayItem::new(ItemKind::Moving(Direction::RightToLeft), "a", 0),
            OverlayItem::new(ItemKind::Stationary(Anchor::Bottom), "b", 100),
        ];
        let mut buffer = Vec::new();
        Track::from_items(items.clone()).write(&mut buffer).unwrap();

        let mut parser: Box<dyn Parser> = Box::new(TrackParser::new(Cursor::new(buffer)));
        assert_eq!(parser.parse().unwrap(), items);
    }

    #[test]
    fn test_track_parser_reports_garbage() {
        let mut parser = TrackParser::new(Cursor::new(b"nope".to_vec()));
        assert!(matches!(parser.parse(), Err(crate::Error::InvalidMagic)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_roundtrip_and_defaults() {
        let items = vec![
            OverlayItem::new(ItemKind::Moving(Direction::LeftToRight), "a", 10).with_tag("t"),
            OverlayItem::new(ItemKind::Stationary(Anchor::Top), "b", 20).hidden(),
        ];
        let json = to_json(&items).unwrap();
        assert_eq!(JsonParser::new(json).parse().unwrap(), items);

        let minimal = r#"[{"text":"x","offset_ms":5,"duration_ms":100,"kind":{"stationary":"top"}}]"#;
        let parsed = JsonParser::new(minimal).parse().unwrap();
        assert!(parsed[0].visible);
        assert_eq!(parsed[0].style.text_size, 25.0);
        assert_eq!(parsed[0].tag_kind(), crate::kind::KindTag::Top);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_parser_reports_errors() {
        let mut parser = JsonParser::new("{ not json");
        assert!(matches!(parser.parse(), Err(crate::Error::Json(_))));
    }
}
