// Invariants of the normalization, merge and MTL stages over generated inputs.

use std::collections::HashSet;

use proptest::prelude::*;

use mtl_converter::config::Config;
use mtl_converter::domain::{EnrichedRecord, EnrichmentFragment, IoRecord, SourceFormat, SourceTag};
use mtl_converter::pipeline::processing::address::AddressNormalizer;
use mtl_converter::pipeline::processing::merge::merge;
use mtl_converter::pipeline::processing::text_library::TextLibrary;
use mtl_converter::pipeline::processing::{Classifier, MtlBuilder, TextProcessor};

const WORDS: &[&str] = &[
    "SEP", "PRESS", "LVL", "TNK", "LP", "HP", "V-700", "1ST", "2nd", "(PSIG)", "4-20", "MA",
    "VFD", "OPEN/CLOSED", "pump", "Tank", "SP", "ALM", "BS&W", "inlet", "OVER-ALL", "Hz",
    "PIT-801", "\"A\"", "disc,", "START",
];

fn description() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..8).prop_map(|words| words.join(" "))
}

fn raw_address() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["readfloat", "READFLOAT", "Alarm", "rack00_slot06", "N7"]),
        0u32..200,
        prop::sample::select(vec!["", "!RD", "!rd", " !WR", "!RD!SC", "  "]),
    )
        .prop_map(|(ident, index, suffix)| format!(" {ident}[{index}]{suffix}"))
}

fn source_tag() -> impl Strategy<Value = SourceTag> {
    prop::sample::select(vec![
        SourceTag::CpaScreen,
        SourceTag::CsvAlias,
        SourceTag::Csv,
        SourceTag::L5k,
    ])
}

proptest! {
    #[test]
    fn prop_address_normalization_is_idempotent(raw in raw_address()) {
        let normalizer = AddressNormalizer::default();
        let once = normalizer.normalize(&raw);
        prop_assert_eq!(normalizer.normalize(&once), once.clone());
        prop_assert!(!once.to_uppercase().ends_with("!RD"));
    }

    #[test]
    fn prop_text_processing_is_idempotent(text in description()) {
        let processor = TextProcessor::default();
        let once = processor.process(&text);
        prop_assert_eq!(processor.process(&once), once);
    }

    #[test]
    fn prop_merge_keeps_one_record_per_base_record_in_any_fragment_order(
        indexes in prop::collection::btree_set(0u32..50, 1..20),
        fragments in prop::collection::vec((0u32..60, source_tag(), description()), 0..40),
    ) {
        let base: Vec<IoRecord> = indexes
            .iter()
            .map(|i| IoRecord::new(format!("READFLOAT[{i}]"), SourceFormat::Cpa))
            .collect();
        let fragments: Vec<EnrichmentFragment> = fragments
            .into_iter()
            .map(|(i, tag, text)| {
                EnrichmentFragment::new(format!("READFLOAT[{i}]"), tag).with_description(text)
            })
            .collect();
        let mut reversed = fragments.clone();
        reversed.reverse();

        let merged = merge(base.clone(), &fragments);
        prop_assert_eq!(merged.len(), base.len());
        for (record, original) in merged.iter().zip(&base) {
            prop_assert_eq!(record.address(), original.address.as_str());
        }
        prop_assert_eq!(merge(base, &reversed), merged);
    }

    #[test]
    fn prop_mtl_target_ids_are_unique(
        records in prop::collection::vec((0u32..20, description()), 0..30),
    ) {
        let records: Vec<EnrichedRecord> = records
            .into_iter()
            .enumerate()
            .map(|(n, (i, text))| {
                EnrichedRecord::from_record(
                    IoRecord::new(format!("READFLOAT[{}]", i * 100 + n as u32), SourceFormat::Cpa)
                        .with_description(text, "IONaming"),
                )
            })
            .collect();
        let outcome = MtlBuilder::from_config(&Config::default()).build(&records);

        prop_assert_eq!(outcome.rows.len(), records.len());
        let ids: HashSet<&str> = outcome.rows.iter().map(|r| r.target_id.as_str()).collect();
        prop_assert_eq!(ids.len(), outcome.rows.len());
    }

    #[test]
    fn prop_alarm_tags_fold_into_their_transmitter(
        (measurement, transmitter) in prop::sample::select(vec![
            ("P", "PIT"),
            ("L", "LIT"),
            ("T", "TIT"),
            ("F", "FIT"),
            ("TD", "TDIT"),
            ("FD", "FDIT"),
            ("PD", "PDIT"),
            ("LX", "LXIT"),
        ]),
        level in prop::sample::select(vec!["HH", "H", "L", "LL"]),
        number in 1u32..10000,
    ) {
        let description = format!("V-700 LEVEL {measurement}A{level}-{number}");
        let record = EnrichedRecord::from_record(
            IoRecord::new("ALARM[2]", SourceFormat::Cpa).with_description(description, "Alarm"),
        );
        let result = Classifier::default().classify(&record);
        prop_assert_eq!(result.target_id, format!("{transmitter}-{number}"));
        prop_assert!(result.alarm_level.is_some());
    }

    #[test]
    fn prop_text_library_lookup_is_deterministic(
        entries in prop::collection::btree_map(1u32..500, "[A-Z][A-Z ]{0,10}[A-Z]", 0..10),
    ) {
        let mut text = String::new();
        for (id, value) in &entries {
            let units: Vec<String> = value.encode_utf16().map(|u| format!("{u:04X}")).collect();
            text.push_str(&format!("No={id}\nTextW={}\n", units.join(" ")));
        }
        let first = TextLibrary::from_text(&text);
        let second = TextLibrary::from_text(&text);
        prop_assert_eq!(&first, &second);
        for (id, value) in &entries {
            prop_assert_eq!(first.resolve(*id), value.clone());
        }
        prop_assert_eq!(first.resolve(9999), String::new());
    }
}
