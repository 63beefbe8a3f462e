//! Write-read roundtrips through in-memory cursors.

use las_dataset::{
    point::Format,
    vlr::{extract_vlr, Payload, TextAreaDescription, Vlr},
    Dataset, Error, Point, PointCloud, ScalarKind, Version,
};
use std::io::Cursor;

fn roundtrip(dataset: &Dataset) -> Dataset {
    let mut cursor = Cursor::new(Vec::new());
    dataset.write_to(&mut cursor).unwrap();
    cursor.set_position(0);
    Dataset::read_from(cursor).unwrap()
}

fn grid_dataset() -> Dataset {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    for i in 0..10 {
        pointcloud.push(&Point {
            x: f64::from(i),
            y: f64::from(i),
            z: f64::from(i),
            classification: i as u8,
            ..Default::default()
        });
    }
    Dataset::new(pointcloud).unwrap()
}

#[test]
fn minimal_v1_1_roundtrip() {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    for i in 0..10 {
        pointcloud.push(&Point {
            x: f64::from(i),
            y: f64::from(i),
            z: f64::from(i),
            classification: i as u8,
            ..Default::default()
        });
    }
    let header = las_dataset::Header::new(Version::new(1, 1)).unwrap();
    let dataset = Dataset::assemble(pointcloud, Some(header), Vec::new(), Vec::new(), Vec::new())
        .unwrap();
    assert_eq!(Version::new(1, 1), dataset.header().version());

    let read_back = roundtrip(&dataset);
    assert_eq!(10, read_back.header().number_of_points());
    assert_eq!(Version::new(1, 1), read_back.header().version());
    for i in 0..10 {
        let point = read_back.point(i);
        assert_eq!(i as f64, point.x);
        assert_eq!(i as f64, point.y);
        assert_eq!(i as f64, point.z);
        assert_eq!(i as u8, point.classification);
    }
    assert_eq!(dataset, read_back);
}

#[test]
fn bit_pack_boundaries() {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    pointcloud.push(&Point {
        return_number: 5,
        number_of_returns: 5,
        scan_direction: true.into(),
        is_edge_of_flight_line: true,
        classification: 31,
        is_synthetic: true,
        is_key_point: false,
        is_withheld: true,
        ..Default::default()
    });
    let dataset = Dataset::new(pointcloud).unwrap();
    let mut cursor = Cursor::new(Vec::new());
    dataset.write_to(&mut cursor).unwrap();
    let bytes = cursor.into_inner();

    let record = &bytes[dataset.header().offset_to_point_data() as usize..];
    // bits 0-2 return number, 3-5 number of returns, 6 scan direction, 7 edge
    assert_eq!(0xED, record[14]);
    // bits 0-4 class, 5 synthetic, 6 key point, 7 withheld
    assert_eq!(0xBF, record[15]);

    let read_back = Dataset::read_from(Cursor::new(bytes)).unwrap();
    let point = read_back.point(0);
    assert_eq!(5, point.return_number);
    assert_eq!(5, point.number_of_returns);
    assert!(bool::from(point.scan_direction));
    assert!(point.is_edge_of_flight_line);
    assert_eq!(31, point.classification);
    assert!(point.is_synthetic);
    assert!(!point.is_key_point);
    assert!(point.is_withheld);
}

#[test]
fn user_columns_roundtrip() {
    let mut dataset = grid_dataset();
    let things: Vec<f64> = (1..=10).map(|n| f64::from(n) / 10.).collect();
    let others: Vec<i16> = (0..10).map(|n| n * 100 - 300).collect();
    dataset.add_column("thing", things.clone()).unwrap();
    dataset.add_column("other", others.clone()).unwrap();

    let extra_bytes = match extract_vlr(dataset.vlrs(), "LASF_Spec", 4)
        .expect("the extra-bytes record exists")
        .payload()
    {
        Payload::ExtraBytes(extra_bytes) => extra_bytes,
        payload => panic!("wrong payload: {:?}", payload),
    };
    assert_eq!(2, extra_bytes.entries().len());
    assert_eq!("thing", extra_bytes.entries()[0].name);
    assert_eq!(ScalarKind::F64, extra_bytes.entries()[0].kind());
    assert_eq!("other", extra_bytes.entries()[1].name);
    assert_eq!(ScalarKind::I16, extra_bytes.entries()[1].kind());

    let read_back = roundtrip(&dataset);
    assert_eq!(
        Some(things.as_slice()),
        read_back.column("thing").unwrap().as_f64()
    );
    assert_eq!(
        Some(others.as_slice()),
        read_back.column("other").unwrap().as_i16()
    );
    assert_eq!(dataset, read_back);
}

#[test]
fn vector_user_column_roundtrip() {
    let mut dataset = grid_dataset();
    let rgbish: Vec<[f64; 3]> = (0..10)
        .map(|n| [f64::from(n), f64::from(n) + 0.5, -f64::from(n)])
        .collect();
    dataset.add_column("rgbish", rgbish).unwrap();

    let read_back = roundtrip(&dataset);
    let extra_bytes = match extract_vlr(read_back.vlrs(), "LASF_Spec", 4)
        .unwrap()
        .payload()
    {
        Payload::ExtraBytes(extra_bytes) => extra_bytes,
        payload => panic!("wrong payload: {:?}", payload),
    };
    let names: Vec<&str> = extra_bytes
        .entries()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(vec!["rgbish [0]", "rgbish [1]", "rgbish [2]"], names);

    let column = read_back.column("rgbish").unwrap();
    assert_eq!(3, column.width());
    assert_eq!(10, column.len());
    assert_eq!(Some(1.5), column.get(1, 1));
    assert_eq!(dataset, read_back);
}

#[test]
fn vlr_supersession() {
    let mut dataset = grid_dataset();
    let a = Vlr::new(
        "LASF_Spec",
        3,
        "",
        TextAreaDescription("the old description".to_string()).into(),
    )
    .unwrap();
    dataset.add_vlr(a).unwrap();
    dataset.set_superseded("LASF_Spec", 3).unwrap();
    let b = Vlr::new(
        "LASF_Spec",
        3,
        "",
        TextAreaDescription("the new description".to_string()).into(),
    )
    .unwrap();
    dataset.add_vlr(b).unwrap();

    assert_eq!(2, dataset.vlrs().len());
    assert_eq!(7, dataset.vlrs()[0].record_id());
    let found = extract_vlr(dataset.vlrs(), "LASF_Spec", 3).unwrap();
    assert_eq!(
        &Payload::TextAreaDescription(TextAreaDescription("the new description".to_string())),
        found.payload()
    );

    let read_back = roundtrip(&dataset);
    assert_eq!(2, read_back.vlrs().len());
    let found = extract_vlr(read_back.vlrs(), "LASF_Spec", 3).unwrap();
    assert_eq!(3, found.record_id());
    assert!(extract_vlr(read_back.vlrs(), "LASF_Spec", 7).is_some());
}

#[test]
fn scale_guard() {
    let coordinate = 3. * f64::from(i32::MAX) * 1e-4;
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    pointcloud.push(&Point {
        x: coordinate,
        ..Default::default()
    });
    assert!(matches!(
        Dataset::new(pointcloud.clone()).unwrap_err(),
        Error::ScaleOutOfRange { .. }
    ));

    let dataset = Dataset::with_scale(pointcloud, 1e-2).unwrap();
    let read_back = roundtrip(&dataset);
    assert!((read_back.point(0).x - coordinate).abs() <= 1e-2);
}

#[test]
fn format_auto_upgrade() {
    let mut dataset = grid_dataset();
    assert_eq!(0, dataset.header().point_format().to_u8().unwrap());

    let colors: Vec<[f64; 3]> = (0..10)
        .map(|n| {
            let channel = f64::from(n * 1000) / f64::from(u16::MAX);
            [channel, channel, channel]
        })
        .collect();
    dataset.add_column("color", colors).unwrap();
    assert_eq!(2, dataset.header().point_format().to_u8().unwrap());
    assert_eq!(Version::new(1, 2), dataset.header().version());

    let nirs: Vec<f64> = (0..10).map(|n| f64::from(n * 2000) / f64::from(u16::MAX)).collect();
    dataset.add_column("nir", nirs).unwrap();
    assert_eq!(8, dataset.header().point_format().to_u8().unwrap());
    assert_eq!(Version::new(1, 4), dataset.header().version());

    let read_back = roundtrip(&dataset);
    assert_eq!(8, read_back.header().point_format().to_u8().unwrap());
    let color = read_back.point(3).color.unwrap();
    assert!((color.red - f64::from(3000) / f64::from(u16::MAX)).abs() <= 1e-6);
}

#[test]
fn extended_format_roundtrip() {
    let mut pointcloud = PointCloud::with_format(Format::new(6).unwrap());
    pointcloud.push(&Point {
        x: 1.,
        y: 2.,
        z: 3.,
        return_number: 12,
        number_of_returns: 15,
        classification: 200,
        is_overlap: true,
        scanner_channel: 3,
        scan_angle: 3.,
        gps_time: Some(123.456),
        ..Default::default()
    });
    let dataset = Dataset::new(pointcloud).unwrap();
    assert_eq!(Version::new(1, 4), dataset.header().version());
    assert!(dataset.header().has_wkt_crs().unwrap());

    let read_back = roundtrip(&dataset);
    let point = read_back.point(0);
    assert_eq!(12, point.return_number);
    assert_eq!(15, point.number_of_returns);
    assert_eq!(200, point.classification);
    assert!(point.is_overlap);
    assert_eq!(3, point.scanner_channel);
    assert_eq!(3., point.scan_angle);
    assert_eq!(Some(123.456), point.gps_time);
    assert_eq!(dataset, read_back);
}

#[test]
fn evlrs_roundtrip() {
    let mut dataset = grid_dataset();
    let evlr = Vlr::new_extended("ACME", 42, "payload", Payload::Bytes(vec![1, 2, 3, 4])).unwrap();
    dataset.add_vlr(evlr).unwrap();
    assert_eq!(Version::new(1, 4), dataset.header().version());

    let read_back = roundtrip(&dataset);
    assert_eq!(1, read_back.evlrs().len());
    assert_eq!("ACME", read_back.evlrs()[0].user_id());
    assert_eq!(
        &Payload::Bytes(vec![1, 2, 3, 4]),
        read_back.evlrs()[0].payload()
    );
    assert_eq!(dataset, read_back);
}

#[test]
fn layout_offsets_hold() {
    let mut dataset = grid_dataset();
    dataset
        .add_vlr(Vlr::new("ACME", 1, "", Payload::Bytes(vec![0; 10])).unwrap())
        .unwrap();
    dataset.add_column("thing", vec![0.0f64; 10]).unwrap();

    let header = dataset.header();
    let vlr_bytes: u64 = dataset.vlrs().iter().map(Vlr::len).sum();
    assert_eq!(
        u64::from(header.size()) + vlr_bytes,
        u64::from(header.offset_to_point_data())
    );
    assert_eq!(28, header.point_data_record_length());

    // and they still hold after a roundtrip
    let read_back = roundtrip(&dataset);
    let header = read_back.header();
    let vlr_bytes: u64 = read_back.vlrs().iter().map(Vlr::len).sum();
    assert_eq!(
        u64::from(header.size()) + vlr_bytes,
        u64::from(header.offset_to_point_data())
    );
}

#[test]
fn bounds_enclose_every_point() {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    for i in 0..100 {
        pointcloud.push(&Point {
            x: f64::from(i % 13) - 6.,
            y: f64::from(i % 7) * 2.,
            z: -f64::from(i % 3),
            ..Default::default()
        });
    }
    let dataset = Dataset::new(pointcloud).unwrap();
    let read_back = roundtrip(&dataset);
    let bounds = read_back.header().bounds();
    for i in 0..read_back.len() {
        assert!(bounds.contains(read_back.pointcloud().position(i)));
    }
}

#[test]
fn per_return_counts_sum_to_point_count() {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    for i in 0..30 {
        pointcloud.push(&Point {
            return_number: (i % 5) + 1,
            ..Default::default()
        });
    }
    let dataset = Dataset::new(pointcloud).unwrap();
    let read_back = roundtrip(&dataset);
    let total: u64 = read_back.header().number_of_points_by_return().iter().sum();
    assert_eq!(read_back.header().number_of_points(), total);
}

#[test]
fn user_defined_bytes_roundtrip() {
    let mut pointcloud = PointCloud::with_format(Format::new(0).unwrap());
    pointcloud.push(&Point::default());
    let dataset = Dataset::assemble(
        pointcloud,
        None,
        Vec::new(),
        Vec::new(),
        vec![0xDE, 0xAD, 0xBE, 0xEF],
    )
    .unwrap();
    assert_eq!(231, dataset.header().offset_to_point_data());

    let read_back = roundtrip(&dataset);
    assert_eq!(&[0xDE, 0xAD, 0xBE, 0xEF], read_back.user_defined_bytes());
    assert_eq!(dataset, read_back);
}

#[test]
fn undocumented_bytes_roundtrip() {
    let mut dataset = grid_dataset();
    let blocks: Vec<[u8; 2]> = (0..10u8).map(|n| [n, n + 100]).collect();
    dataset.add_column("undocumented_bytes", blocks).unwrap();
    assert_eq!(22, dataset.header().point_data_record_length());
    // no extra-bytes record documents undocumented padding
    assert!(extract_vlr(dataset.vlrs(), "LASF_Spec", 4).is_none());

    let read_back = roundtrip(&dataset);
    let column = read_back.column("undocumented_bytes").unwrap();
    assert_eq!(2, column.width());
    assert_eq!(Some(105.), column.get(5, 1));
    assert_eq!(dataset, read_back);
}
