//! Table D (sequence descriptors), f = 3.
//!
//! A representative subset sufficient to exercise the query engine's
//! replication, sequence and scalar handling — not the full WMO table.

use super::TableDEntry;
use crate::{Descriptor, XY};

/// `3-01-001`: a delayed-replicated list of (channel number, brightness
/// temperature) pairs, one entry per sounding channel.
static BRIT_ELEMENTS: &[Descriptor] = &[
    Descriptor { f: 1, x: 2, y: 0 },
    Descriptor { f: 0, x: 31, y: 1 },
    Descriptor { f: 0, x: 5, y: 42 },
    Descriptor { f: 0, x: 12, y: 163 },
];

/// `3-01-002`: a synthetic microwave-sounder subset combining
/// identification, location and a `BRIT` radiance sequence.
static ATMS_ELEMENTS: &[Descriptor] = &[
    Descriptor { f: 0, x: 1, y: 7 },
    Descriptor { f: 0, x: 4, y: 1 },
    Descriptor { f: 0, x: 4, y: 2 },
    Descriptor { f: 0, x: 4, y: 3 },
    Descriptor { f: 0, x: 4, y: 4 },
    Descriptor { f: 0, x: 4, y: 5 },
    Descriptor { f: 0, x: 5, y: 2 },
    Descriptor { f: 0, x: 6, y: 2 },
    Descriptor { f: 0, x: 7, y: 1 },
    Descriptor { f: 3, x: 1, y: 1 },
];

/// `3-01-003`: identification + location only, used by scalar-field tests.
static SURFACE_ELEMENTS: &[Descriptor] = &[
    Descriptor { f: 0, x: 1, y: 195 },
    Descriptor { f: 0, x: 4, y: 1 },
    Descriptor { f: 0, x: 4, y: 2 },
    Descriptor { f: 0, x: 4, y: 3 },
    Descriptor { f: 0, x: 4, y: 4 },
    Descriptor { f: 0, x: 4, y: 5 },
    Descriptor { f: 0, x: 5, y: 2 },
    Descriptor { f: 0, x: 6, y: 2 },
];

pub(super) static TABLE_D: &[TableDEntry] = &[
    TableDEntry {
        xy: XY { x: 1, y: 1 },
        mnemonic: "BRIT",
        category: "Radiance",
        title: "MICROWAVE RADIANCE SEQUENCE",
        sub_title: "REPLICATED CHANNEL/BRIGHTNESS TEMPERATURE PAIRS",
        elements: BRIT_ELEMENTS,
    },
    TableDEntry {
        xy: XY { x: 1, y: 2 },
        mnemonic: "ATMS",
        category: "Satellite sounding",
        title: "ATMS-LIKE MICROWAVE SOUNDER SUBSET",
        sub_title: "IDENTIFICATION, LOCATION AND RADIANCE SEQUENCE",
        elements: ATMS_ELEMENTS,
    },
    TableDEntry {
        xy: XY { x: 1, y: 3 },
        mnemonic: "SFCOBS",
        category: "Surface observation",
        title: "SURFACE STATION SUBSET",
        sub_title: "IDENTIFICATION AND LOCATION ONLY",
        elements: SURFACE_ELEMENTS,
    },
];
