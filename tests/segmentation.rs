use nread::models::{Block, headings_of};
use nread::navigation::NavigationIndex;
use nread::segment::{Strategy, segment, segment_raw};

fn index_of(blocks: &[Block]) -> NavigationIndex {
    NavigationIndex::new(headings_of(blocks))
}

#[test]
fn test_blank_line_novel_builds_index() {
    let blocks = segment_raw("第1章 开端\n这是第一段。\n\n第2章\n第二段内容。");
    assert_eq!(
        blocks,
        vec![
            Block::heading("01", "第01章 开端"),
            Block::paragraph("这是第一段。"),
            Block::heading("02", "第02章"),
            Block::paragraph("第二段内容。"),
        ]
    );

    let index = index_of(&blocks);
    assert_eq!(index.len(), 2);
    assert_eq!(index.find_by_number(2), Some(1));
    assert_eq!(index.next("01").map(|h| h.id.as_str()), Some("02"));
    assert!(index.previous("01").is_none());
}

#[test]
fn test_short_lines_merge_into_one_paragraph() {
    let raw = "清晨起身。\r\n推窗看雪。\r\n雪还在下。\r\n";
    assert_eq!(
        segment_raw(raw),
        vec![Block::paragraph("清晨起身。 推窗看雪。 雪还在下。")]
    );
}

#[test]
fn test_run_on_line_is_chunked_without_losing_text() {
    let sentence = "他沿着河岸一直走到天黑才停下来歇脚，";
    let raw = format!("{}结束。", sentence.repeat(12));
    assert_eq!(Strategy::detect(&raw), Strategy::Sentences);

    let blocks = segment(&raw);
    assert!(blocks.len() > 1);
    let joined: String = blocks.iter().map(Block::text).collect();
    assert_eq!(joined, raw);
}

#[test]
fn test_whitespace_only_source_has_no_blocks() {
    let blocks = segment_raw("\u{FEFF} \r\n\t");
    assert!(blocks.is_empty());
    assert!(index_of(&blocks).is_empty());
}

#[test]
fn test_jump_filter_matches_titles() {
    let blocks = segment_raw("第1章 风起\n\n甲。\n\n第2章 雪落\n\n乙。\n\n第10章 风停\n\n丙。");
    let index = index_of(&blocks);
    let titles: Vec<&str> = index
        .filter("风")
        .into_iter()
        .map(|(_, h)| h.title.as_str())
        .collect();
    assert_eq!(titles, vec!["第01章 风起", "第10章 风停"]);
    assert_eq!(index.find_by_number(10), Some(2));
    assert_eq!(index.find_by_number(3), None);
}
