//! End-to-end tests for loading imzML datasets

#[cfg(test)]
mod test {
    use std::{fs, io, path::Path};

    use crate::io::imzml::{
        is_imzml, ImzMLDataset, ImzMLError, ImzMLParser, ImzMLParserError, ZAxisMode,
    };
    use crate::meta::keys;
    use crate::params::PropertyStore;
    use crate::spectrum::BinaryDataArrayType;

    const SMALL: &str = "./test/data/small.imzML";
    const PROCESSED: &str = "./test/data/processed_no_pixel_size.imzML";
    const LEGACY_3D: &str = "./test/data/legacy_3d.imzML";

    #[test]
    fn test_is_imzml_detection() -> io::Result<()> {
        let content = fs::read(SMALL)?;
        assert!(is_imzml(&content));
        Ok(())
    }

    #[test_log::test]
    fn test_small_dataset() -> io::Result<()> {
        let dataset = ImzMLParser::new().open_path(SMALL)?;
        let meta = &dataset.metadata;

        assert_eq!(meta.dimensions(), [3, 2, 1]);
        assert_eq!(meta.pixel_size(), [0.1, 0.1, 0.01]);
        assert_eq!(meta.origin(), [2.0, 0.5, 0.0]);
        assert!(!meta.has_default_pixel_size());
        assert_eq!(meta.number_of_measurements(), Some(6));
        assert_eq!(meta.get_unsigned("max dimension y"), Some(200));
        assert_eq!(dataset.is_continuous(), Some(true));
        assert_eq!(
            meta.get_text(keys::UUID),
            Some("4e3d2f1a-9b8c-4d7e-a6f5-0123456789ab")
        );
        assert_eq!(meta.get_text("m/z array"), Some("mzArray"));
        assert_eq!(meta.get_text("intensity array value type"), Some("32-bit float"));
        assert_eq!(meta.get_text("[IC1] instrument model"), Some("ultrafleXtreme"));
        assert_eq!(meta.get_text("[analyzer] time-of-flight"), Some(""));

        assert_eq!(dataset.len(), 6);
        let source = &dataset.sources[0];
        assert_eq!(source.ibd_path, Path::new("./test/data/small.ibd"));
        let indices: Vec<_> = source.spectra.iter().map(|r| r.index).collect();
        assert_eq!(
            indices,
            [
                [0, 0, 0],
                [1, 0, 0],
                [2, 0, 0],
                [0, 1, 0],
                [1, 1, 0],
                [2, 1, 0]
            ]
        );
        let record = &source.spectra[4];
        assert_eq!(record.mz_offset, 16);
        assert_eq!(record.mz_length, 4);
        assert_eq!(record.int_offset, 96);
        assert_eq!(record.int_length, 4);
        assert_eq!(record.in_file_normalization_factor, 5.0);

        assert!(source.check_ibd_uuid(meta));
        let mut ibd = source.open_ibd()?;
        let bytes = ibd.read_array(
            record.int_offset,
            record.int_length,
            BinaryDataArrayType::Float32,
        )?;
        let intensities: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(intensities, [40.0, 41.0, 42.0, 43.0]);
        Ok(())
    }

    #[test_log::test]
    fn test_processed_without_pixel_size() -> io::Result<()> {
        let dataset = ImzMLParser::new().open_path(PROCESSED)?;
        let meta = &dataset.metadata;

        assert_eq!(meta.pixel_size(), [0.05, 0.05, 0.01]);
        assert!(meta.has_default_pixel_size());
        assert_eq!(meta.dimensions(), [2, 1, 2]);
        assert_eq!(dataset.is_continuous(), Some(false));
        assert_eq!(meta.get_unsigned("m/z array value type (bytes)"), Some(8));
        assert_eq!(meta.get_unsigned("intensity array value type (bytes)"), Some(4));
        assert_eq!(
            meta.get_text(keys::IBD_MD5),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );

        let spectra = &dataset.sources[0].spectra;
        let zs: Vec<_> = spectra.iter().map(|r| r.z()).collect();
        assert_eq!(zs, [0, 0, 1, 1]);
        let offsets: Vec<_> = spectra
            .iter()
            .map(|r| (r.mz_offset, r.mz_length, r.int_offset, r.int_length))
            .collect();
        assert_eq!(
            offsets,
            [(16, 3, 40, 3), (52, 4, 84, 4), (100, 5, 140, 5), (160, 6, 208, 6)]
        );
        assert!(spectra
            .iter()
            .all(|r| r.in_file_normalization_factor == 1.0));
        Ok(())
    }

    #[test_log::test]
    fn test_legacy_3d() -> io::Result<()> {
        let dataset = ImzMLParser::new().open_path(LEGACY_3D)?;
        let meta = &dataset.metadata;

        assert_eq!(meta.get_double(keys::SQUARED_PIXEL_SIZE), Some(400.0));
        assert_eq!(meta.pixel_size(), [0.02, 0.02, 0.02]);
        assert_eq!(meta.origin(), [1.0, -0.25, 0.04]);
        assert_eq!(meta.dimensions(), [2, 2, 4]);

        let spectra = &dataset.sources[0].spectra;
        let zs: Vec<_> = spectra.iter().map(|r| r.z()).collect();
        assert_eq!(zs, [0, 0, 1, 1, 2, 3]);
        assert_eq!(spectra[3].world, [40.0, 40.0, 20.0]);
        assert_eq!((spectra[3].x(), spectra[3].y()), (1, 1));
        Ok(())
    }

    #[test]
    fn test_buffer_capacity() -> io::Result<()> {
        let reference = ImzMLParser::new().open_path(SMALL)?;
        let dataset = ImzMLParser::with_buffer_capacity(64).open_path(SMALL)?;
        assert_eq!(dataset, reference);
        Ok(())
    }

    #[test_log::test]
    fn test_multiple_sources() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.imzML");
        let second = dir.path().join("second.imzML");
        fs::copy(SMALL, &first)?;
        fs::copy(PROCESSED, &second)?;

        let mut dataset = ImzMLDataset::from_paths([&first, &second]);
        let parser = ImzMLParser::new();
        parser.read_image_metadata(&mut dataset)?;
        // The later source's header wins
        assert!(dataset.metadata.has_default_pixel_size());
        assert!(dataset.is_empty());

        parser.read_spectrum_metadata(&mut dataset)?;
        assert_eq!(dataset.sources[0].len(), 6);
        assert_eq!(dataset.sources[1].len(), 4);
        assert_eq!(dataset.metadata.number_of_measurements(), Some(10));
        assert_eq!(dataset.sources[1].ibd_path, dir.path().join("second.ibd"));
        Ok(())
    }

    #[test_log::test]
    fn test_sources_with_different_array_groups() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.imzML");
        let second = dir.path().join("second.imzML");
        fs::copy(SMALL, &first)?;
        let content = fs::read_to_string(SMALL)?
            .replace("mzArray", "mzArr2")
            .replace("intensityArray", "intArr2");
        fs::write(&second, content)?;

        let mut dataset = ImzMLDataset::from_paths([&first, &second]);
        ImzMLParser::new().load(&mut dataset)?;

        let groups = &dataset.sources[0].array_groups;
        assert_eq!(groups.mz.as_deref(), Some("mzArray"));
        assert_eq!(groups.intensity.as_deref(), Some("intensityArray"));
        let groups = &dataset.sources[1].array_groups;
        assert_eq!(groups.mz.as_deref(), Some("mzArr2"));
        assert_eq!(groups.intensity.as_deref(), Some("intArr2"));

        for source in dataset.sources.iter() {
            let record = &source.spectra[4];
            assert_eq!(
                (record.mz_offset, record.mz_length),
                (16, 4),
                "{}",
                source.imzml_path.display()
            );
            assert_eq!((record.int_offset, record.int_length), (96, 4));
        }
        Ok(())
    }

    #[test_log::test]
    fn test_malformed_source_clears_all_records() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("good.imzML");
        let bad = dir.path().join("bad.imzML");
        fs::copy(SMALL, &good)?;
        let content = fs::read_to_string(SMALL)?.replacen(
            r#"name="external offset" value="32""#,
            r#"name="external offset" value="3two""#,
            1,
        );
        fs::write(&bad, content)?;

        let mut dataset = ImzMLDataset::from_paths([&good, &bad]);
        let err = ImzMLParser::new().load(&mut dataset).unwrap_err();
        assert_eq!(err.path(), bad.as_path());
        match &err {
            ImzMLError::Source {
                source: ImzMLParserError::MalformedNumber { value, .. },
                ..
            } => assert_eq!(value, "3two"),
            e => panic!("Unexpected error {e}"),
        }
        assert!(dataset.is_empty());

        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = ImzMLParser::new()
            .open_path("./test/data/missing.imzML")
            .unwrap_err();
        assert!(matches!(err, ImzMLError::Open { .. }));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_z_axis_summary() -> io::Result<()> {
        let mut dataset = ImzMLParser::new().open_path(LEGACY_3D)?;
        let spectra = &mut dataset.sources[0].spectra;
        let summary =
            crate::io::imzml::resolve_z_axis(spectra, true, &mut dataset.metadata);
        assert_eq!(summary.mode, ZAxisMode::World);
        assert_eq!(summary.slices, 4);
        assert_eq!(summary.spacing, Some(0.02));
        Ok(())
    }
}
