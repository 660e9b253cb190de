// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-based checks of propagation and formatting.

mod common;

use std::rc::Rc;

use common::{Element, Person, full_name, sum_and_split};
use proptest::prelude::*;
use understory_binding::{
    BindingMode, BindingRegistry, Coordinator, MultiBinding, SourceBinding, Value,
    format_positional,
};

fn split_panel() -> (Rc<Element>, Rc<Element>, Rc<Element>, BindingRegistry, Coordinator) {
    let a = Element::new("a");
    let b = Element::new("b");
    let panel = Element::new("panel").with_child(&a).with_child(&b);
    panel.load().unwrap();
    let registry = BindingRegistry::new();
    let coordinator = registry
        .attach(
            &panel.element(),
            "Count",
            MultiBinding::builder()
                .source(SourceBinding::path("Count").element_name("a"))
                .source(SourceBinding::path("Count").element_name("b"))
                .converter(sum_and_split())
                .mode(BindingMode::TwoWay)
                .build(),
        )
        .unwrap();
    (panel, a, b, registry, coordinator)
}

prop_compose! {
    /// A source edit: which source, and the new value.
    fn arb_edit()(first in any::<bool>(), value in -10_000_i32..10_000) -> (bool, i32) {
        (first, value)
    }
}

proptest! {
    /// The target always equals the sum of the sources, whatever order they
    /// change in.
    #[test]
    fn target_tracks_source_edits(edits in prop::collection::vec(arb_edit(), 0..32)) {
        let (panel, a, b, _registry, _coordinator) = split_panel();
        for (first, value) in edits {
            let source = if first { &a } else { &b };
            source.set_count(value).unwrap();
            prop_assert_eq!(panel.count.get(), a.count.get() + b.count.get());
        }
    }

    /// A target edit splits back into sources that aggregate to the same
    /// value, and the target is written exactly once.
    #[test]
    fn target_edits_split_back_consistently(total in -100_000_i32..100_000) {
        let (panel, a, b, _registry, coordinator) = split_panel();
        let writes = panel.count_writes.get();

        panel.set_count(total).unwrap();
        prop_assert_eq!(a.count.get() + b.count.get(), total);
        prop_assert_eq!(panel.count_writes.get(), writes + 1);

        coordinator.update_target().unwrap();
        prop_assert_eq!(panel.count.get(), total);
    }

    /// Converting a derived name back yields the original sources.
    #[test]
    fn names_round_trip(first in "[A-Za-z]{1,12}", last in "[A-Za-z]{1,12}") {
        let person = Person::new("x", "y", 0);
        let label = Element::new("label");
        label.load().unwrap();
        let registry = BindingRegistry::new();
        registry
            .attach(
                &label.element(),
                "Text",
                MultiBinding::builder()
                    .source(SourceBinding::path("FirstName").source(person.object()))
                    .source(SourceBinding::path("LastName").source(person.object()))
                    .converter(full_name())
                    .mode(BindingMode::TwoWay)
                    .build(),
            )
            .unwrap();

        label.set_text(format!("{first} {last}")).unwrap();
        prop_assert_eq!(&*person.first.borrow(), &first);
        prop_assert_eq!(&*person.last.borrow(), &last);
        prop_assert_eq!(label.text(), format!("{first} {last}"));
    }

    /// Formatting never panics, whatever the pattern.
    #[test]
    fn formatting_never_panics(pattern in ".{0,64}", args in prop::collection::vec(any::<i32>(), 0..4)) {
        let args: Vec<Value> = args.into_iter().map(Value::new).collect();
        let _ = format_positional(&pattern, &args);
    }

    /// Text without braces passes through unchanged.
    #[test]
    fn brace_free_text_is_verbatim(text in "[^{}]{0,64}") {
        prop_assert_eq!(format_positional(&text, &[]).unwrap(), text);
    }
}
