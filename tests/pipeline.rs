//! End-to-end coverage of the export → encode pipeline: split-driven
//! multi-file encoding and composite-key dedup, exercised against synthetic
//! [`DataObject`]s rather than a decoded BUFR archive, since the
//! query/decoder side already has its own unit tests in
//! `src/query_runner.rs` and `src/result_set.rs`. Driven through the public
//! API with small, hand-built fixtures rather than golden files.

use bufr_query::data_container::DataContainer;
use bufr_query::encoder::description::{Description, VariableDescription};
use bufr_query::encoder;
use bufr_query::exporter::split::ValueSplit;
use bufr_query::exporter::variable::Variable;
use bufr_query::exporter::Exporter;
use bufr_query::mapping::Mapping;
use bufr_query::DataObject;

fn goes_sensor_fixture() -> DataContainer {
    let mut dc = DataContainer::new();
    dc.add(
        "lat",
        DataObject::from_f64(
            "lat".to_string(),
            vec![4],
            vec![10.0, 20.0, 30.0, 40.0],
        ),
        &vec![],
    )
    .unwrap();
    dc.add(
        "sensor",
        DataObject::from_strings(
            "sensor".to_string(),
            vec![4],
            vec![
                "goes-16".to_string(),
                "goes-16".to_string(),
                "goes-16".to_string(),
                "goes-17".to_string(),
            ],
        ),
        &vec![],
    )
    .unwrap();
    dc
}

#[test]
fn split_partitions_rows_by_sensor_before_encode() {
    let raw = goes_sensor_fixture();
    let exporter = Exporter {
        filters: vec![],
        splits: vec![Box::new(ValueSplit {
            name: "sensor".to_string(),
            variable: "sensor".to_string(),
        })],
        variables: vec![Variable::new("MetaData/latitude", "lat")],
    };

    let exported = exporter.export(&raw).unwrap();
    assert_eq!(exported.all_sub_categories().len(), 2);

    let goes16 = exported
        .get("MetaData/latitude", &vec!["goes-16".to_string()])
        .unwrap();
    assert_eq!(goes16.dims(), &[3]);

    let goes17 = exported
        .get("MetaData/latitude", &vec!["goes-17".to_string()])
        .unwrap();
    assert_eq!(goes17.dims(), &[1]);
}

#[test]
fn split_multi_file_encode_writes_one_file_per_category() {
    let raw = goes_sensor_fixture();
    let exporter = Exporter {
        filters: vec![],
        splits: vec![Box::new(ValueSplit {
            name: "sensor".to_string(),
            variable: "sensor".to_string(),
        })],
        variables: vec![Variable::new("MetaData/latitude", "lat")],
    };
    let exported = exporter.export(&raw).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("out_{sensor}.h5").to_string_lossy().into_owned();

    let description = Description {
        output_path_template: template,
        dimensions: vec![],
        variables: vec![VariableDescription {
            name: "MetaData/latitude".to_string(),
            source: "MetaData/latitude".to_string(),
            long_name: "Latitude".to_string(),
            units: "degrees_north".to_string(),
            coordinates: None,
            range: None,
            chunks: vec![],
            compression_level: None,
        }],
        globals: vec![],
    };

    let written = encoder::netcdf::write_all(&description, &exported).unwrap();
    assert_eq!(written.len(), 2);
    for path in &written {
        assert!(path.exists());
    }

    let goes16_path = dir.path().join("out_goes-16.h5");
    let goes17_path = dir.path().join("out_goes-17.h5");
    assert!(written.contains(&goes16_path));
    assert!(written.contains(&goes17_path));

    let f16 = hdf5::File::open(&goes16_path).unwrap();
    let ds = f16.dataset("MetaData/latitude").unwrap();
    assert_eq!(ds.shape(), vec![3]);

    let f17 = hdf5::File::open(&goes17_path).unwrap();
    let ds17 = f17.dataset("MetaData/latitude").unwrap();
    assert_eq!(ds17.shape(), vec![1]);
}

#[test]
fn dedup_over_composite_key_keeps_first_occurrence() {
    let mut dc = DataContainer::new();
    dc.add(
        "SID",
        DataObject::from_strings(
            "SID".to_string(),
            vec![3],
            vec!["A".to_string(), "B".to_string(), "A".to_string()],
        ),
        &vec![],
    )
    .unwrap();
    dc.add(
        "LAT",
        DataObject::from_f64("LAT".to_string(), vec![3], vec![1.0, 3.0, 1.0]),
        &vec![],
    )
    .unwrap();
    dc.add(
        "LON",
        DataObject::from_f64("LON".to_string(), vec![3], vec![2.0, 4.0, 2.0]),
        &vec![],
    )
    .unwrap();
    dc.add(
        "VAL",
        DataObject::from_strings(
            "VAL".to_string(),
            vec![3],
            vec!["x".to_string(), "y".to_string(), "z".to_string()],
        ),
        &vec![],
    )
    .unwrap();

    dc.deduplicate(&["SID".to_string(), "LAT".to_string(), "LON".to_string()])
        .unwrap();

    let val = dc.get("VAL", &vec![]).unwrap();
    assert_eq!(val.dims(), &[2]);
    let DataObject::String(col) = val else {
        panic!("expected a string column");
    };
    assert_eq!(col.data, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn mapping_yaml_drives_exporter_and_description_consistently() {
    let yaml = r#"
bufr:
  subsets: [ATMS]
  variables:
    - name: latitude
      query: "*/CLAT"
  splits: []
  filters: []
encoder:
  outputPathTemplate: "out.h5"
  dimensions: []
  variables:
    - name: MetaData/latitude
      source: latitude
      longName: Latitude
      units: degrees_north
  globals:
    - type: string
      name: platform
      value: NOAA-20
"#;
    let mapping = Mapping::from_yaml_str(yaml).unwrap();

    let mut raw = DataContainer::new();
    raw.add(
        "latitude",
        DataObject::from_f64("latitude".to_string(), vec![2], vec![1.0, 2.0]),
        &vec![],
    )
    .unwrap();

    let exporter = mapping.bufr.to_exporter();
    let exported = exporter.export(&raw).unwrap();
    assert_eq!(exported.get("MetaData/latitude", &vec![]).unwrap().dims(), &[2]);

    let description = Description::from_config(&mapping.encoder).unwrap();
    assert_eq!(description.variables.len(), 1);
    assert_eq!(description.globals[0].name, "platform");
}

#[test]
fn dimension_description_rejects_duplicate_names() {
    use bufr_query::mapping::{DimensionConfig, EncoderConfig, OutputVariableConfig};

    let config = EncoderConfig {
        output_path_template: "out.h5".to_string(),
        dimensions: vec![
            DimensionConfig {
                name: "Channel".to_string(),
                path: Some("*/BRIT/CHNM".to_string()),
                paths: vec![],
                source: Some("channel".to_string()),
            },
            DimensionConfig {
                name: "Channel".to_string(),
                path: None,
                paths: vec![],
                source: None,
            },
        ],
        variables: vec![OutputVariableConfig {
            name: "x".to_string(),
            source: "x".to_string(),
            long_name: "X".to_string(),
            units: String::new(),
            coordinates: None,
            range: None,
            chunks: vec![],
            compression_level: None,
        }],
        globals: vec![],
    };

    assert!(Description::from_config(&config).is_err());
}

