use std::time::Duration;

use pagepick::preview::{PageCheckbox, PageSize, PageToggle};
use pagepick::range_set;
use pagepick::test_utils::test_helpers::*;
use pagepick::{PageSelection, PrintOptions};

const LIMIT: Duration = Duration::from_secs(5);

fn loaded_controller(pages: usize) -> pagepick::PreviewController {
    let engine = ScriptedEngine::new().with_document(
        b"doc",
        DocumentScript::uniform(pages, PageSize::new(600.0, 800.0)),
    );
    let (mut controller, _controls) = controller_for(engine, (316.0, 1616.0));
    controller.open(b"doc".as_slice());
    assert!(controller.wait_until_idle(LIMIT));
    controller
}

fn checkboxes(controller: &mut pagepick::PreviewController) -> Vec<PageCheckbox> {
    controller
        .rows()
        .into_iter()
        .filter_map(|row| row.checkbox)
        .collect()
}

#[test]
fn test_checkboxes_follow_valid_set() {
    let mut controller = loaded_controller(3);
    assert!(checkboxes(&mut controller).is_empty(), "selection mode is off");

    controller.set_selection(PageSelection::from_text("1-2"));
    let boxes = checkboxes(&mut controller);
    assert_eq!(
        boxes,
        vec![
            PageCheckbox { page: 1, checked: true, enabled: true },
            PageCheckbox { page: 2, checked: true, enabled: true },
            PageCheckbox { page: 3, checked: false, enabled: true },
        ]
    );
}

#[test]
fn test_toggle_round_trips_through_host_selection() {
    let mut controller = loaded_controller(3);
    let mut selection = PageSelection::from_text("1-2");
    controller.set_selection(selection.clone());

    let toggle = controller.toggle_page(2).expect("checkbox enabled");
    assert_eq!(
        toggle,
        PageToggle {
            page: 3,
            included: true,
            total_pages: 3
        }
    );
    selection
        .set_page_included(toggle.page, toggle.included, toggle.total_pages)
        .unwrap();
    assert_eq!(selection.text(), "1-3");

    controller.set_selection(selection.clone());
    let toggle = controller.toggle_page(1).expect("checkbox enabled");
    selection
        .set_page_included(toggle.page, toggle.included, toggle.total_pages)
        .unwrap();
    assert_eq!(selection.text(), "1, 3");
    assert_eq!(selection.valid_set(), "1, 3");
}

#[test]
fn test_checkbox_disabled_while_text_is_invalid() {
    let mut controller = loaded_controller(3);
    let mut selection = PageSelection::from_text("2");
    selection.set_text("2, 3-");
    controller.set_selection(selection);

    let boxes = checkboxes(&mut controller);
    assert!(boxes.iter().all(|checkbox| !checkbox.enabled));
    // Still reflects the last valid selection
    assert!(boxes[1].checked);
    assert!(!boxes[2].checked);
    assert_eq!(controller.toggle_page(0), None);
}

#[test]
fn test_print_options_carry_typed_text() {
    let mut selection = PageSelection::new();
    selection.set_text("5-1");
    let options = PrintOptions::with_selection(&selection);
    assert_eq!(options.pages, "5-1");
    assert!(range_set::parse(&options.pages).is_err());
}
