//! Table B (element descriptors), f = 0.
//!
//! This is a representative subset of the WMO master table, covering the
//! identification, time, location and sounding fields exercised by this
//! crate's tests and worked examples — not the full table.

use super::TableBEntry;
use crate::XY;

pub(super) static TABLE_B: &[TableBEntry] = &[
    TableBEntry {
        xy: XY { x: 1, y: 1 },
        mnemonic: "WMOB",
        class_name: "Identification",
        element_name: "WMO BLOCK NUMBER",
        unit: "NUMERIC",
        scale: 0,
        reference_value: 0,
        bits: 7,
    },
    TableBEntry {
        xy: XY { x: 1, y: 2 },
        mnemonic: "WMOS",
        class_name: "Identification",
        element_name: "WMO STATION NUMBER",
        unit: "NUMERIC",
        scale: 0,
        reference_value: 0,
        bits: 10,
    },
    TableBEntry {
        xy: XY { x: 1, y: 7 },
        mnemonic: "SAID",
        class_name: "Identification",
        element_name: "SATELLITE IDENTIFIER",
        unit: "CODE TABLE",
        scale: 0,
        reference_value: 0,
        bits: 10,
    },
    TableBEntry {
        xy: XY { x: 1, y: 195 },
        mnemonic: "SID",
        class_name: "Identification",
        element_name: "STATION IDENTIFICATION",
        unit: "CCITT IA5",
        scale: 0,
        reference_value: 0,
        bits: 64,
    },
    TableBEntry {
        xy: XY { x: 2, y: 1 },
        mnemonic: "TOST",
        class_name: "Instrumentation",
        element_name: "TYPE OF STATION",
        unit: "CODE TABLE",
        scale: 0,
        reference_value: 0,
        bits: 2,
    },
    TableBEntry {
        xy: XY { x: 4, y: 1 },
        mnemonic: "YEAR",
        class_name: "Location (time)",
        element_name: "YEAR",
        unit: "YEAR",
        scale: 0,
        reference_value: 0,
        bits: 12,
    },
    TableBEntry {
        xy: XY { x: 4, y: 2 },
        mnemonic: "MNTH",
        class_name: "Location (time)",
        element_name: "MONTH",
        unit: "MONTH",
        scale: 0,
        reference_value: 0,
        bits: 4,
    },
    TableBEntry {
        xy: XY { x: 4, y: 3 },
        mnemonic: "DAYS",
        class_name: "Location (time)",
        element_name: "DAY",
        unit: "DAY",
        scale: 0,
        reference_value: 0,
        bits: 6,
    },
    TableBEntry {
        xy: XY { x: 4, y: 4 },
        mnemonic: "HOUR",
        class_name: "Location (time)",
        element_name: "HOUR",
        unit: "HOUR",
        scale: 0,
        reference_value: 0,
        bits: 5,
    },
    TableBEntry {
        xy: XY { x: 4, y: 5 },
        mnemonic: "MINU",
        class_name: "Location (time)",
        element_name: "MINUTE",
        unit: "MINUTE",
        scale: 0,
        reference_value: 0,
        bits: 6,
    },
    TableBEntry {
        xy: XY { x: 5, y: 2 },
        mnemonic: "CLAT",
        class_name: "Location (horizontal-1)",
        element_name: "LATITUDE (COARSE ACCURACY)",
        unit: "DEGREE",
        scale: 2,
        reference_value: -9000,
        bits: 15,
    },
    TableBEntry {
        xy: XY { x: 5, y: 1 },
        mnemonic: "CLATH",
        class_name: "Location (horizontal-1)",
        element_name: "LATITUDE (HIGH ACCURACY)",
        unit: "DEGREE",
        scale: 5,
        reference_value: -9_000_000,
        bits: 25,
    },
    TableBEntry {
        xy: XY { x: 6, y: 2 },
        mnemonic: "CLON",
        class_name: "Location (horizontal-2)",
        element_name: "LONGITUDE (COARSE ACCURACY)",
        unit: "DEGREE",
        scale: 2,
        reference_value: -18000,
        bits: 16,
    },
    TableBEntry {
        xy: XY { x: 6, y: 1 },
        mnemonic: "CLONH",
        class_name: "Location (horizontal-2)",
        element_name: "LONGITUDE (HIGH ACCURACY)",
        unit: "DEGREE",
        scale: 5,
        reference_value: -18_000_000,
        bits: 26,
    },
    TableBEntry {
        xy: XY { x: 7, y: 1 },
        mnemonic: "HSMSL",
        class_name: "Location (vertical)",
        element_name: "HEIGHT OF STATION",
        unit: "METERS",
        scale: 0,
        reference_value: -400,
        bits: 15,
    },
    TableBEntry {
        xy: XY { x: 5, y: 42 },
        mnemonic: "CHNM",
        class_name: "Radiance",
        element_name: "CHANNEL NUMBER",
        unit: "NUMERIC",
        scale: 0,
        reference_value: 0,
        bits: 6,
    },
    TableBEntry {
        xy: XY { x: 12, y: 163 },
        mnemonic: "TMBR",
        class_name: "Temperature",
        element_name: "BRIGHTNESS TEMPERATURE",
        unit: "KELVIN",
        scale: 2,
        reference_value: 0,
        bits: 16,
    },
    TableBEntry {
        xy: XY { x: 31, y: 1 },
        mnemonic: "DRP8",
        class_name: "Replication",
        element_name: "DELAYED DESCRIPTOR REPLICATION FACTOR",
        unit: "NUMERIC",
        scale: 0,
        reference_value: 0,
        bits: 8,
    },
];
