use m3u_regroup::models::{RegionPolicy, SkipReason};
use m3u_regroup::services::pipeline::{NoopObserver, Pipeline};
use m3u_regroup::services::rewriter::UrlRewriter;
use m3u_regroup::services::ruleset::Ruleset;

const SAMPLE: &str = include_str!("fixtures/guangdong_sample.m3u");

fn pipeline_with(ruleset: &Ruleset) -> Pipeline {
    Pipeline::new(
        ruleset,
        UrlRewriter::new("rtp://", "http://10.0.0.1:4022", "udp"),
        "https://live.fanmingming.com/tv/{id}.png",
        None,
    )
    .unwrap()
}

fn legacy_ruleset() -> Ruleset {
    Ruleset::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/rulesets/legacy-matched.json")).unwrap()
}

#[test]
fn sample_playlist_counts() {
    let output = pipeline_with(&Ruleset::default()).run(SAMPLE, &mut NoopObserver);

    assert_eq!(output.stats.metadata_lines, 15);
    assert_eq!(output.stats.entries, 12);
    assert_eq!(output.stats.rewritten, 11);
    assert_eq!(output.stats.skipped.get(&SkipReason::MissingName), Some(&1));
    assert_eq!(output.stats.skipped.get(&SkipReason::UnsupportedScheme), Some(&1));
    assert_eq!(output.stats.skipped.get(&SkipReason::MissingAddress), Some(&1));
}

#[test]
fn sample_playlist_ids_and_groups() {
    let output = pipeline_with(&Ruleset::default()).run(SAMPLE, &mut NoopObserver);
    let pairs: Vec<(&str, &str)> = output
        .entries
        .iter()
        .map(|e| (e.channel_id.as_str(), e.group.as_str()))
        .collect();

    assert_eq!(
        pairs,
        vec![
            ("CCTV1", "央视"),
            ("CCTV1", "央视"),
            ("CCTV5+", "央视"),
            ("CCTV4K", "央视"),
            ("广东卫视", "卫视"),
            ("凤凰卫视中文台", "凤凰"),
            ("求索纪录", "数字频道"),
            ("CGTN", "国际"),
            ("广东珠江", "地方"),
            ("广州综合", "广州"),
            ("TVB翡翠台", "港澳台"),
            ("家庭影院", "其他"),
        ]
    );
}

#[test]
fn sample_playlist_grouped_order() {
    let output = pipeline_with(&Ruleset::default()).run(SAMPLE, &mut NoopObserver);
    let headers: Vec<&str> = output
        .grouped
        .lines()
        .filter_map(|l| l.strip_suffix(",#genre#"))
        .collect();

    assert_eq!(
        headers,
        vec!["央视", "卫视", "数字频道", "国际", "地方", "凤凰", "广州", "港澳台", "其他"]
    );
}

#[test]
fn annotated_and_grouped_forms_agree() {
    let output = pipeline_with(&Ruleset::default()).run(SAMPLE, &mut NoopObserver);

    let annotated: Vec<&str> = output.annotated.lines().collect();
    assert_eq!(annotated[0], "#EXTM3U");
    assert_eq!(annotated.len(), 1 + 2 * output.entries.len());
    assert_eq!(
        annotated[1],
        "#EXTINF:-1 tvg-id=\"CCTV1\" tvg-name=\"CCTV1\" tvg-logo=\"https://live.fanmingming.com/tv/CCTV1.png\" group-title=\"央视\",CCTV-1 高清"
    );
    assert_eq!(annotated[2], "http://10.0.0.1:4022/udp/239.77.1.1:5146");

    let grouped_members: Vec<&str> = output
        .grouped
        .lines()
        .filter(|l| !l.is_empty() && !l.ends_with(",#genre#"))
        .collect();
    assert_eq!(grouped_members.len(), output.entries.len());
    for entry in &output.entries {
        let line = format!("{},{}", entry.display_name, entry.rewritten_address);
        assert_eq!(grouped_members.iter().filter(|l| **l == line).count(), 1);
    }
}

#[test]
fn every_output_address_is_http() {
    let output = pipeline_with(&Ruleset::default()).run(SAMPLE, &mut NoopObserver);
    assert!(output
        .entries
        .iter()
        .all(|e| e.rewritten_address.starts_with("http://") || e.rewritten_address.starts_with("https://")));
    assert!(output.entries.iter().all(|e| !e.display_name.is_empty()));
}

#[test]
fn legacy_ruleset_uses_matched_region_labels() {
    let ruleset = legacy_ruleset();
    assert_eq!(ruleset.region_policy, RegionPolicy::Matched);

    let output = pipeline_with(&ruleset).run(SAMPLE, &mut NoopObserver);
    let group_of = |name: &str| {
        output
            .entries
            .iter()
            .find(|e| e.display_name.starts_with(name))
            .map(|e| e.group.clone())
    };

    assert_eq!(group_of("CCTV-1").as_deref(), Some("央视高清"));
    assert_eq!(group_of("广东珠江").as_deref(), Some("广东"));
    assert_eq!(group_of("凤凰卫视").as_deref(), Some("凤凰"));
    assert_eq!(output.grouped.lines().next(), Some("央视高清,#genre#"));
}

#[test]
fn policy_override_collapses_legacy_regions() {
    let ruleset = legacy_ruleset().with_region_policy(RegionPolicy::Collapsed);
    let output = pipeline_with(&ruleset).run(SAMPLE, &mut NoopObserver);
    assert!(output.entries.iter().any(|e| e.group == "地方"));
    assert!(!output.entries.iter().any(|e| e.group == "广东"));
}

#[test]
fn passthrough_rewrites_whole_document() {
    let pipeline = pipeline_with(&Ruleset::default());
    let (processed, replaced) = pipeline.rewriter().rewrite_document(SAMPLE);
    assert_eq!(replaced, 12);
    assert!(!processed.contains("rtp://"));
    assert_eq!(processed.lines().count(), SAMPLE.lines().count());
}

#[test]
fn display_name_kept_verbatim_in_both_outputs() {
    let text = "#EXTM3U\n#EXTINF:-1,广东卫视  1080P 720P\nrtp://239.77.2.1:5146\n";
    let output = pipeline_with(&Ruleset::default()).run(text, &mut NoopObserver);

    assert_eq!(output.entries[0].display_name, "广东卫视  1080P 720P");
    assert_eq!(output.entries[0].channel_id, "广东卫视");
    assert!(output.annotated.contains(",广东卫视  1080P 720P\n"));
    assert!(output
        .grouped
        .contains("广东卫视  1080P 720P,http://10.0.0.1:4022/udp/239.77.2.1:5146\n"));
}
