mod common;

use common::*;
use kdp_assembly::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

fn coordinator() -> RegenerationCoordinator {
    RegenerationCoordinator::new(Arc::new(test_policy())).unwrap()
}

fn replacement(rgb: [u8; 3]) -> PixelBuffer {
    PixelBuffer::solid_rgb(trim_px(), trim_px(), TEST_DPI, rgb)
}

#[test]
fn test_replace_content_page_is_isolated() {
    let coordinator = coordinator();
    let ebook = ebook("iso", "premium-color", EbookStatus::Draft);
    let mut pages = book_pages(5);
    let request = ExportRequest::default();

    let before = coordinator.export(&ebook, &pages, &request).unwrap();
    let before_full = digests(&before.artifact(ArtifactKind::FullBook).unwrap().bytes);
    let untouched: Vec<_> = pages
        .pages()
        .iter()
        .filter(|p| p.index != 3)
        .cloned()
        .collect();

    let regen = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Index(3),
            replacement([0, 0, 0]),
            &request,
        )
        .unwrap();

    assert_eq!(regen.page_index, 3);
    assert_eq!(regen.role, PageRole::Content);
    assert_eq!(
        regen.reassembled,
        vec![ArtifactKind::FullBook, ArtifactKind::InteriorManuscript]
    );
    assert!(regen.report.artifact(ArtifactKind::CoverOnly).is_none());

    // Other pages' buffers are untouched
    for page in &untouched {
        assert_eq!(
            pages.find(PageSelector::Index(page.index)).unwrap(),
            page
        );
    }

    // Only the replaced page changes in the rebuilt full book; content
    // index 3 is the third content page, after the front cover
    let after_full = digests(&regen.report.artifact(ArtifactKind::FullBook).unwrap().bytes);
    assert_eq!(before_full.len(), after_full.len());
    for (position, (a, b)) in before_full.iter().zip(&after_full).enumerate() {
        if position == 3 {
            assert_ne!(a, b);
        } else {
            assert_eq!(a, b, "page at position {} changed", position);
        }
    }
}

#[test]
fn test_replace_cover_rebuilds_cover_artifacts() {
    let coordinator = coordinator();
    let ebook = ebook("covers", "premium-color", EbookStatus::Approved);
    let mut pages = book_pages(3);

    let regen = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Role(PageRole::BackCover),
            replacement([250, 250, 250]),
            &ExportRequest::default(),
        )
        .unwrap();

    assert_eq!(regen.role, PageRole::BackCover);
    assert_eq!(
        regen.reassembled,
        vec![ArtifactKind::FullBook, ArtifactKind::CoverOnly]
    );
    assert!(regen.report.artifact(ArtifactKind::InteriorManuscript).is_none());
    assert!(regen.report.artifact(ArtifactKind::CoverOnly).is_some());
}

#[test]
fn test_replace_is_scoped_to_requested_kinds() {
    let coordinator = coordinator();
    let ebook = ebook("scoped", "premium-color", EbookStatus::Draft);
    let mut pages = book_pages(3);

    let regen = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Index(1),
            replacement([9, 9, 9]),
            &ExportRequest::only(&[ArtifactKind::InteriorManuscript, ArtifactKind::CoverOnly]),
        )
        .unwrap();
    assert_eq!(regen.reassembled, vec![ArtifactKind::InteriorManuscript]);
    assert_eq!(regen.report.artifacts.len(), 1);
}

#[test]
fn test_published_ebook_rejects_replacement() {
    let coordinator = coordinator();
    let ebook = ebook("pub", "premium-color", EbookStatus::Published);
    let mut pages = book_pages(3);
    let original = pages.clone();

    let err = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Index(2),
            replacement([0, 0, 0]),
            &ExportRequest::default(),
        )
        .unwrap_err();

    match err {
        AssemblyError::Lifecycle(violation) => {
            assert_eq!(violation.status, EbookStatus::Published);
            assert_eq!(violation.action, LifecycleAction::ReplacePage);
        }
        other => panic!("expected lifecycle violation, got {:?}", other),
    }
    assert_eq!(pages, original);
}

#[test]
fn test_unknown_page_is_not_found() {
    let coordinator = coordinator();
    let ebook = ebook("missing", "premium-color", EbookStatus::Draft);
    let mut pages = book_pages(3);

    let err = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Index(99),
            replacement([0, 0, 0]),
            &ExportRequest::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::PageNotFound(PageSelector::Index(99))
    ));

    // Role selectors must match exactly one page
    let err = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Role(PageRole::Content),
            replacement([0, 0, 0]),
            &ExportRequest::default(),
        )
        .unwrap_err();
    assert!(matches!(err, AssemblyError::PageNotFound(_)));
}

#[test]
fn test_bad_replacement_is_revalidated() {
    let coordinator = coordinator();
    let ebook = ebook("revalidate", "premium-color", EbookStatus::Draft);
    let mut pages = book_pages(3);

    let regen = coordinator
        .replace_page(
            &ebook,
            &mut pages,
            PageSelector::Index(2),
            PixelBuffer::solid_rgb(20, 20, TEST_DPI, [0, 0, 0]),
            &ExportRequest::default(),
        )
        .unwrap();
    assert!(regen.report.is_blocked());
    assert!(regen.report.artifacts.is_empty());
    let low: Vec<_> = regen
        .report
        .validation
        .of_kind(ViolationKind::ImageResolutionTooLow)
        .collect();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].page_index, Some(2));
}

#[test]
fn test_concurrent_replacements() {
    let coordinator = Arc::new(coordinator());
    let books: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|id| ebook(id, "premium-color", EbookStatus::Draft))
        .collect();

    std::thread::scope(|scope| {
        for ebook in &books {
            // Two workers per ebook contend on the same lock
            for worker in 0..2u8 {
                let coordinator = Arc::clone(&coordinator);
                scope.spawn(move || {
                    let mut pages = book_pages(3);
                    let regen = coordinator
                        .replace_page(
                            ebook,
                            &mut pages,
                            PageSelector::Index(1 + worker as usize),
                            replacement([worker, worker, worker]),
                            &ExportRequest::only(&[ArtifactKind::InteriorManuscript]),
                        )
                        .unwrap();
                    assert_eq!(regen.report.artifacts.len(), 1);
                });
            }
        }
    });
    assert_eq!(coordinator.locked_ebooks(), 0);
}

#[test]
fn test_same_ebook_calls_never_overlap() {
    let coordinator = coordinator();
    let id = EbookId::new("serial");
    let inside = AtomicUsize::new(0);
    let overlapped = AtomicBool::new(false);
    let entries = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..6 {
            scope.spawn(|| {
                for _ in 0..5 {
                    coordinator.with_ebook_lock(&id, || {
                        if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlapped.store(true, Ordering::SeqCst);
                        }
                        entries.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            });
        }
    });

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(entries.load(Ordering::SeqCst), 30);
    assert_eq!(coordinator.locked_ebooks(), 0);
}

#[test]
fn test_other_ebooks_proceed_while_one_is_held() {
    let coordinator = &coordinator();
    let held = &ebook("held", "premium-color", EbookStatus::Draft);
    let other = ebook("other", "premium-color", EbookStatus::Draft);
    let waiter_ran = &AtomicBool::new(false);
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            coordinator.with_ebook_lock(&held.id, || {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        });
        entered_rx.recv().unwrap();

        let waiter = scope.spawn(move || {
            coordinator.with_ebook_lock(&held.id, || waiter_ran.store(true, Ordering::SeqCst))
        });

        // A full export of another ebook finishes while "held" stays locked
        let report = coordinator
            .export(
                &other,
                &book_pages(3),
                &ExportRequest::only(&[ArtifactKind::InteriorManuscript]),
            )
            .unwrap();
        assert_eq!(report.artifacts.len(), 1);
        assert!(!waiter_ran.load(Ordering::SeqCst));
        assert!(coordinator.locked_ebooks() >= 1);

        release_tx.send(()).unwrap();
        waiter.join().unwrap();
        assert!(waiter_ran.load(Ordering::SeqCst));
    });
    assert_eq!(coordinator.locked_ebooks(), 0);
}

#[test]
fn test_lock_table_does_not_grow() {
    let coordinator = coordinator();
    for i in 0..1000 {
        coordinator.with_ebook_lock(&EbookId::new(format!("book-{}", i)), || ());
    }
    assert_eq!(coordinator.locked_ebooks(), 0);

    let draft = ebook("kept", "premium-color", EbookStatus::Draft);
    let mut pages = book_pages(2);
    let request = ExportRequest::only(&[ArtifactKind::InteriorManuscript]);
    coordinator.export(&draft, &pages, &request).unwrap();
    coordinator
        .replace_page(
            &draft,
            &mut pages,
            PageSelector::Index(1),
            replacement([1, 1, 1]),
            &request,
        )
        .unwrap();

    // Failed calls release their entry too
    let published = ebook("locked-out", "premium-color", EbookStatus::Published);
    let result = coordinator.replace_page(
        &published,
        &mut pages,
        PageSelector::Index(1),
        replacement([2, 2, 2]),
        &request,
    );
    assert!(result.is_err());
    assert_eq!(coordinator.locked_ebooks(), 0);
}

#[test]
fn test_lifecycle_transitions() {
    assert!(EbookStatus::Draft.can_transition_to(EbookStatus::Approved));
    assert!(EbookStatus::Approved.can_transition_to(EbookStatus::Published));
    assert!(!EbookStatus::Published.can_transition_to(EbookStatus::Draft));
    assert!(EbookStatus::Published.transition(EbookStatus::Draft).is_err());
}
