//! Table C (operator descriptors), f = 2.
//!
//! A representative subset; `reader::DataReader` interprets the handful of
//! operators it supports directly from `(x, y)`, so this table exists purely
//! for descriptive lookup (e.g. by CLI tools that print a descriptor's name).

use super::TableCEntry;

pub(super) static TABLE_C: &[TableCEntry] = &[
    TableCEntry {
        xy: (1, None),
        operator_name: "CHANGE DATA WIDTH",
        operation_definition: "Add (Y-128) bits to the defined bit width of each data descriptor",
    },
    TableCEntry {
        xy: (2, None),
        operator_name: "CHANGE SCALE",
        operation_definition: "Add (Y-128) to the defined scale of each data descriptor",
    },
    TableCEntry {
        xy: (6, None),
        operator_name: "SIGNIFY DATA WIDTH",
        operation_definition: "Y bits of data width follow for the next local descriptor",
    },
    TableCEntry {
        xy: (8, None),
        operator_name: "CHANGE WIDTH OF CCITT IA5 FIELD",
        operation_definition: "Y characters (Y*8 bits) for character data descriptors",
    },
    TableCEntry {
        xy: (22, Some(0)),
        operator_name: "QUALITY INFORMATION FOLLOWS",
        operation_definition: "Marks the start of a quality information sequence",
    },
];
