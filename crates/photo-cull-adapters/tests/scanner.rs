//! Integration tests for the trip-folder scanner.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;

use photo_cull_adapters::{LedgerStore, LibraryScanner};
use photo_cull_core::Pool;
use photo_cull_test_support::{LibraryBuilder, MockJournal, MockProgressSink};

const DATE: &str = "2024-06-01";

#[test]
fn test_paris_scenario() {
    let library = LibraryBuilder::new();
    library.image("Paris2023", "a.jpg", 4000, 3000);
    library.image("Paris2023", "b.jpg", 100, 100);
    let settings = library.settings();
    let journal = MockJournal::new();
    let progress = MockProgressSink::new();

    let summary = LibraryScanner::new(&settings, &journal, &progress)
        .run(DATE)
        .unwrap();

    assert_eq!(summary.total_selected, 1);
    assert_eq!(summary.total_edit, 1);
    assert_eq!(summary.folders[0].folder, "Paris2023");
    assert!(summary.folders[0].marked);
    assert_eq!(LibraryBuilder::file_names(&library.selected()), ["a.jpg"]);
    assert_eq!(LibraryBuilder::file_names(&library.needs_edit()), ["b.jpg"]);

    // Sources stay where they were.
    assert!(library.base().join("Paris2023/a.jpg").exists());
    assert!(library.base().join("Paris2023/b.jpg").exists());

    let ledger = LedgerStore::new(settings.ledger_path()).load().unwrap();
    assert_eq!(ledger.processed_on("Paris2023"), Some(DATE));

    assert_eq!(journal.events_for(Pool::Selected).len(), 1);
    let edit = journal.events_for(Pool::NeedsEdit);
    assert_eq!(edit.len(), 1);
    assert!(edit[0].reason.as_deref().unwrap().contains("100x100"));
    assert_eq!(progress.decided_count(), 2);
}

#[test]
fn test_second_scan_is_idempotent() {
    let library = LibraryBuilder::new().with_min_resolution(64, 48);
    library.image("Rome", "a.jpg", 64, 48);
    let settings = library.settings();
    let journal = MockJournal::new();

    let first = LibraryScanner::new(&settings, &journal, &MockProgressSink::new())
        .run(DATE)
        .unwrap();
    assert_eq!(first.total_selected, 1);

    // Removing the copy proves the second run does not copy again.
    fs::remove_file(library.selected().join("a.jpg")).unwrap();
    let progress = MockProgressSink::new();
    let second = LibraryScanner::new(&settings, &journal, &progress)
        .run("2024-06-02")
        .unwrap();

    assert!(second.folders.is_empty());
    assert_eq!(second.skipped, ["Rome"]);
    assert_eq!(progress.skipped_folders(), ["Rome"]);
    assert!(LibraryBuilder::file_names(&library.selected()).is_empty());

    let ledger = LedgerStore::new(settings.ledger_path()).load().unwrap();
    assert_eq!(ledger.processed_on("Rome"), Some(DATE));
}

#[test]
fn test_rescan_all_processes_again() {
    let library = LibraryBuilder::new().with_min_resolution(64, 48);
    library.image("Rome", "a.jpg", 64, 48);
    let mut settings = library.settings();
    let journal = MockJournal::new();
    LibraryScanner::new(&settings, &journal, &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    settings.rescan_all = true;
    let summary = LibraryScanner::new(&settings, &journal, &MockProgressSink::new())
        .run("2024-07-01")
        .unwrap();

    assert_eq!(summary.total_selected, 1);
    let ledger = LedgerStore::new(settings.ledger_path()).load().unwrap();
    assert_eq!(ledger.processed_on("Rome"), Some("2024-07-01"));
}

#[test]
fn test_invalid_extension_is_never_copied() {
    let library = LibraryBuilder::new().with_min_resolution(8, 8);
    library.file("Oslo/photo.GIF", b"GIF89a");
    library.image("Oslo", "photo.JPG", 32, 32);
    let settings = library.settings();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    assert_eq!(summary.total_selected, 1);
    assert_eq!(summary.total_edit, 0);
    assert_eq!(LibraryBuilder::file_names(&library.selected()), ["photo.JPG"]);
}

#[test]
fn test_pool_folders_are_not_trips() {
    let library = LibraryBuilder::new().with_min_resolution(8, 8);
    library.image("Selected", "kept.jpg", 32, 32);
    library.image("needs_edit", "fix.jpg", 32, 32);
    library.image("meta", "odd.jpg", 32, 32);
    library.image("Lisbon", "a.jpg", 32, 32);
    let settings = library.settings();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    let folders: Vec<_> = summary.folders.iter().map(|f| f.folder.as_str()).collect();
    assert_eq!(folders, ["Lisbon"]);
    assert_eq!(
        LibraryBuilder::file_names(&library.selected()),
        ["a.jpg", "kept.jpg"]
    );
}

#[test]
fn test_unreadable_image_goes_to_edit() {
    let library = LibraryBuilder::new().with_min_resolution(8, 8);
    library.file("Berlin/broken.jpg", b"not really a jpeg");
    let settings = library.settings();
    let journal = MockJournal::new();

    let summary = LibraryScanner::new(&settings, &journal, &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    assert_eq!(summary.total_edit, 1);
    assert_eq!(LibraryBuilder::file_names(&library.needs_edit()), ["broken.jpg"]);
    let events = journal.events_for(Pool::NeedsEdit);
    assert!(events[0].reason.as_deref().unwrap().starts_with("unreadable"));
}

#[test]
fn test_folders_processed_in_name_order() {
    let library = LibraryBuilder::new().with_min_resolution(8, 8);
    for trip in ["Zurich", "Amsterdam", "Madrid"] {
        library.image(trip, "a.jpg", 16, 16);
    }
    let settings = library.settings();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    let folders: Vec<_> = summary.folders.iter().map(|f| f.folder.as_str()).collect();
    assert_eq!(folders, ["Amsterdam", "Madrid", "Zurich"]);
    let ledger = LedgerStore::new(settings.ledger_path()).load().unwrap();
    assert_eq!(ledger.len(), 3);
}

#[test]
fn test_creates_pool_directories() {
    let library = LibraryBuilder::new();
    let settings = library.settings();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    assert!(summary.folders.is_empty());
    assert!(settings.selected_dir.is_dir());
    assert!(settings.meta_dir.is_dir());
    assert!(settings.needs_edit_dir.is_dir());
    assert!(settings.ledger_path().is_file());
}

#[test]
fn test_copy_failure_leaves_folder_unmarked() {
    let library = LibraryBuilder::new().with_min_resolution(8, 8);
    library.image("Vienna", "a.jpg", 16, 16);
    let settings = library.settings();
    photo_cull_adapters::fs::ensure_pool_dirs(&settings).unwrap();
    // A directory squatting on the destination name makes the copy fail.
    fs::create_dir_all(library.selected().join("a.jpg")).unwrap();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    assert_eq!(summary.total_failed, 1);
    assert!(!summary.folders[0].marked);
    let ledger = LedgerStore::new(settings.ledger_path()).load().unwrap();
    assert!(!ledger.contains("Vienna"));
}

#[test]
fn test_mislabelled_png_is_sized_by_content() {
    let library = LibraryBuilder::new().with_min_resolution(64, 48);
    let path = library.base().join("Oslo/a.jpg");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::new(64, 48)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    let settings = library.settings();

    let summary = LibraryScanner::new(&settings, &MockJournal::new(), &MockProgressSink::new())
        .run(DATE)
        .unwrap();

    assert_eq!(summary.total_selected, 1);
    assert_eq!(LibraryBuilder::file_names(&library.selected()), ["a.jpg"]);
}
