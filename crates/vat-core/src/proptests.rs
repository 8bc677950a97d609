//! Property-based tests for vat-core
//!
//! These tests verify the pointer and correlation properties using proptest.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::correlator::TimestampCorrelator;
    use crate::pointer::PointerState;
    use crate::types::{ObservedTimestamp, PointerEvent, PointerEventKind, PointerSample};

    fn arb_event() -> impl Strategy<Value = PointerEvent> {
        (0u8..3, any::<u16>(), any::<u16>()).prop_map(|(kind, x, y)| {
            let kind = match kind {
                0 => PointerEventKind::ButtonDown,
                1 => PointerEventKind::ButtonUp,
                _ => PointerEventKind::Move,
            };
            PointerEvent { kind, x, y }
        })
    }

    fn arb_timestamp() -> impl Strategy<Value = ObservedTimestamp> {
        (-1_000_000i64..2_000_000_000i64, 0i32..1_000_000)
            .prop_map(|(s, us)| ObservedTimestamp::new(s, us))
    }

    // Drag sequences: during a drag the sample follows the latest coordinate,
    // after release it is inactive.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_drag_tracks_latest_coordinate(
            start in (any::<u16>(), any::<u16>()),
            moves in prop::collection::vec((any::<u16>(), any::<u16>()), 0..32)
        ) {
            let state = PointerState::new();
            state.button_down(start.0, start.1);
            let mut last = start;
            for (x, y) in moves {
                state.moved(x, y);
                last = (x, y);
                prop_assert_eq!(state.read(), PointerSample { active: true, x, y });
            }
            state.button_up();
            let sample = state.read();
            prop_assert!(!sample.active);
            prop_assert_eq!((sample.x, sample.y), last);
        }

        #[test]
        fn test_idle_moves_never_change_coordinate(
            events in prop::collection::vec(arb_event(), 0..64)
        ) {
            let state = PointerState::new();
            for event in events {
                let before = state.read();
                state.apply(event);
                let after = state.read();
                if event.kind == PointerEventKind::Move && !before.active {
                    prop_assert_eq!(before, after);
                }
            }
        }

        #[test]
        fn test_matches_reference_model(
            events in prop::collection::vec(arb_event(), 0..64)
        ) {
            let state = PointerState::new();
            let mut model = PointerSample::default();
            for event in events {
                match event.kind {
                    PointerEventKind::ButtonDown => {
                        model = PointerSample { active: true, x: event.x, y: event.y };
                    }
                    PointerEventKind::Move if model.active => {
                        model.x = event.x;
                        model.y = event.y;
                    }
                    PointerEventKind::Move => {}
                    PointerEventKind::ButtonUp => model.active = false,
                }
                state.apply(event);
                prop_assert_eq!(state.read(), model);
            }
        }
    }

    // Correlation: every stamp precedes the observed reference, successive
    // stamps strictly decrease, and microseconds stay in range.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_stamps_strictly_decrease_below_reference(
            reference in arb_timestamp(),
            emissions in 1usize..64
        ) {
            let correlator = TimestampCorrelator::new();
            correlator.observe(reference);

            let mut previous = reference;
            for _ in 0..emissions {
                let ts = correlator.next_annotation_timestamp().unwrap();
                prop_assert!(ts < previous);
                prop_assert_eq!(previous.as_micros() - ts.as_micros(), 1);
                prop_assert!((0..1_000_000).contains(&ts.microseconds));
                previous = ts;
            }
            prop_assert!(previous < reference);
        }

        #[test]
        fn test_observe_then_one_emission(reference in arb_timestamp()) {
            let correlator = TimestampCorrelator::new();
            correlator.observe(reference);
            let ts = correlator.next_annotation_timestamp().unwrap();
            if reference.microseconds == 0 {
                prop_assert_eq!(ts, ObservedTimestamp::new(reference.seconds - 1, 999_999));
            } else {
                prop_assert_eq!(ts, ObservedTimestamp::new(reference.seconds, reference.microseconds - 1));
            }
        }
    }
}
