//! Integration tests for the full change pipeline
//!
//! Covers the documented laws (identity, delete/insert/replace, nesting,
//! cut suppression and merging) through the public API.

use edit_align::{
    apply_changes, normalize_cuts, AlignmentKey, AlignmentRegistry, Backmapper, Chunk,
    DocumentId, EditOperation,
};

const TEXT: &str = "ABCDEFGHIJ";

fn run(ops: &[EditOperation]) -> String {
    apply_changes(TEXT, ops).expect("pipeline").text()
}

#[test]
fn test_identity() {
    let result = apply_changes(TEXT, &[]).unwrap();
    assert_eq!(result.text(), TEXT);
    assert_eq!(result.aligned.chunks(), &[Chunk::Original { range: 0..10 }]);
    for i in 0..TEXT.len() {
        assert_eq!(result.aligned.translate_to_original(i), Ok(Some(i)));
    }
}

#[test]
fn test_delete_length_law() {
    let result = apply_changes(TEXT, &[EditOperation::delete(2, 5)]).unwrap();
    assert_eq!(result.text(), "ABFGHIJ");
    assert_eq!(result.aligned.len(), 7);
    assert_eq!(result.aligned.translate_to_original(2), Ok(Some(5)));
}

#[test]
fn test_insert_shift_law() {
    let result = apply_changes(TEXT, &[EditOperation::insert(0, "XY")]).unwrap();
    assert_eq!(result.text(), "XYABCDEFGHIJ");
    assert_eq!(result.aligned.translate_to_original(2), Ok(Some(0)));
}

#[test]
fn test_replace_composition() {
    assert_eq!(run(&[EditOperation::replace(1, 3, "Z")]), "AZDEFGHIJ");
}

#[test]
fn test_nesting_selection() {
    let both = apply_changes(
        TEXT,
        &[EditOperation::delete(0, 10), EditOperation::delete(2, 5)],
    )
    .unwrap();
    let alone = apply_changes(TEXT, &[EditOperation::delete(0, 10)]).unwrap();
    assert_eq!(both.text(), alone.text());
    assert_eq!(both.report.applied, vec![EditOperation::delete(0, 10)]);
}

#[test]
fn test_cut_suppression() {
    let with_insert = run(&[EditOperation::cut(3, 6), EditOperation::insert(4, "XYZ")]);
    assert_eq!(with_insert, "ABCGHIJ");
    assert_eq!(with_insert, run(&[EditOperation::delete(3, 6)]));
}

#[test]
fn test_cut_merge() {
    let normalized = normalize_cuts(vec![EditOperation::cut(2, 4), EditOperation::cut(3, 7)], 10);
    assert_eq!(normalized.operations, vec![EditOperation::delete(2, 7)]);
    assert_eq!(
        run(&[EditOperation::cut(2, 4), EditOperation::cut(3, 7)]),
        "ABHIJ"
    );
}

#[test]
fn test_longest_wins_at_same_offset() {
    let result = apply_changes(
        TEXT,
        &[
            EditOperation::replace(3, 5, "a"),
            EditOperation::replace(3, 7, "b"),
        ],
    )
    .unwrap();
    assert_eq!(result.text(), "ABCbHIJ");
    assert_eq!(result.report.applied, vec![EditOperation::replace(3, 7, "b")]);
    assert_eq!(
        result.report.discarded,
        vec![EditOperation::replace(3, 5, "a")]
    );
}

#[test]
fn test_exact_duplicates_apply_once() {
    let insert = EditOperation::insert(5, "-");
    assert_eq!(run(&[insert.clone(), insert]), "ABCDE-FGHIJ");

    let delete = EditOperation::delete(1, 2);
    assert_eq!(run(&[delete.clone(), delete]), "ACDEFGHIJ");
}

#[test]
fn test_cut_with_surrounding_changes() {
    let ops = vec![
        EditOperation::replace(0, 1, "a"),
        EditOperation::delete(2, 4),
        EditOperation::cut(3, 6),
        EditOperation::replace(5, 7, "zz"),
        EditOperation::insert(8, "+"),
    ];
    // delete(2,4) ends inside the cut and vanishes with it, replace(5,7) is dropped
    let result = apply_changes(TEXT, &ops).unwrap();
    assert_eq!(result.text(), "aBCGH+IJ");
    let discarded = &result.report.discarded;
    assert!(discarded.contains(&EditOperation::delete(2, 4)));
    assert!(discarded.contains(&EditOperation::replace(5, 7, "zz")));
}

#[test]
fn test_delete_overlapping_cut_start() {
    let result = apply_changes(
        TEXT,
        &[EditOperation::delete(1, 4), EditOperation::cut(3, 6)],
    )
    .unwrap();
    assert_eq!(result.text(), "ABCGHIJ");
    assert_eq!(result.report.applied, vec![EditOperation::delete(3, 6)]);
}

#[test]
fn test_delete_running_past_cut_end() {
    let result = apply_changes(
        TEXT,
        &[EditOperation::cut(2, 5), EditOperation::delete(4, 8)],
    )
    .unwrap();
    assert_eq!(result.text(), "ABIJ");
    assert_eq!(
        result.report.applied,
        vec![EditOperation::delete(5, 8), EditOperation::delete(2, 5)]
    );
}

#[test]
fn test_cut_beyond_end_is_clipped() {
    assert_eq!(run(&[EditOperation::cut(7, 100)]), "ABCDEFG");
}

#[test]
fn test_untouched_regions_round_trip() {
    let ops = vec![
        EditOperation::insert(1, "__"),
        EditOperation::replace(3, 4, "dd"),
        EditOperation::delete(6, 8),
    ];
    let result = apply_changes(TEXT, &ops).unwrap();
    let aligned = &result.aligned;
    let current = aligned.get();
    assert_eq!(current, "A__BCddEFIJ");

    for (offset, ch) in current.char_indices() {
        if let Some(original) = aligned.translate_to_original(offset).unwrap() {
            assert_eq!(TEXT[original..].chars().next(), Some(ch));
            assert_eq!(aligned.translate_to_current(original), Ok(Some(offset)));
        }
    }
    assert_eq!(aligned.deleted_ranges(), vec![3..4, 6..8]);
}

#[test]
fn test_unicode_offsets() {
    let text = "naïve café";
    // 'ï' is bytes 2..4, 'é' is bytes 10..12
    let ops = vec![
        EditOperation::replace(2, 4, "i"),
        EditOperation::insert(12, "!"),
    ];
    let result = apply_changes(text, &ops).unwrap();
    assert_eq!(result.text(), "naive café!");
    assert_eq!(result.aligned.translate_to_original(3), Ok(Some(4)));

    let bad = apply_changes(text, &[EditOperation::delete(3, 4)]).unwrap();
    assert_eq!(bad.text(), text);
    assert_eq!(bad.report.rejected.len(), 1);
}

#[test]
fn test_independent_documents_in_one_registry() {
    let registry = AlignmentRegistry::new();
    let docs = [
        ("doc-a", "first document", EditOperation::delete(0, 6)),
        ("doc-b", "second document", EditOperation::insert(0, "the ")),
    ];

    std::thread::scope(|scope| {
        for (id, text, op) in &docs {
            let registry = registry.clone();
            scope.spawn(move || {
                let result = apply_changes(text, std::slice::from_ref(op)).unwrap();
                result
                    .register(&registry, AlignmentKey::new(*id, "source", "target"))
                    .unwrap();
            });
        }
    });

    let mapper = Backmapper::new(&registry);
    let a = mapper
        .backmap(&DocumentId::new("doc-a"), "source", "target", &[0..8])
        .unwrap();
    let b = mapper
        .backmap(&DocumentId::new("doc-b"), "source", "target", &[4..10])
        .unwrap();
    assert_eq!(a, vec![6..14]);
    assert_eq!(b, vec![0..6]);
}
