//! Flow tests for Michi
//!
//! Entering, moving through, calling and leaving flows.
//!
mod common;
use common::*;
use michi::flow::{ABANDONED_FLOW, FLOW_ID_PARAM, FLOW_RETURN_DEPTH_PARAM, Parameter, TO_FLOW_DOCUMENT_ID_PARAM};
use michi::navigation::MAX_RESOLUTION_DEPTH;
use michi::prelude::*;
use michi::trace::Strategy;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn routed_booking_flow() -> Flow {
    Flow::new("", "booking")
        .with_start_node("route")
        .with_node(switch_node(
            "route",
            &[("#{booking.express}", "express")],
            Some("standard"),
        ))
        .with_node(view_node("express", "/booking/express.xhtml"))
        .with_node(view_node("standard", "/booking/standard.xhtml"))
}

#[cfg(test)]
mod flow_entry_tests {
    use super::*;

    #[test]
    fn test_entry_through_view_start_node_transitions_once() {
        let harness = Fixture {
            flows: vec![simple_flow("booking")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, None, Some("booking"), "")
            .expect("navigation should succeed");

        assert_eq!(result.view_id(), Some("/booking/booking.xhtml"));
        assert_eq!(harness.flow_handler.transitions(), vec!["<none> -> booking".to_string()]);
        assert_eq!(harness.current_flow_id(&ctx), Some("booking".to_string()));
        assert_eq!(harness.flow_handler.rollbacks(), 0);
        assert!(!ctx.attributes.did_transition);
    }

    #[test]
    fn test_entry_through_switch_start_node() {
        let harness = Fixture {
            flows: vec![routed_booking_flow()],
            evaluator: ScopedEvaluator::new().with_variable("booking.express", true),
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{nav.book}"), Some("booking"), "")
            .unwrap();

        assert_eq!(result.view_id(), Some("/booking/express.xhtml"));
        // The speculative entry is the only transition; dispatch does not repeat it.
        assert_eq!(harness.flow_handler.transitions(), vec!["<none> -> booking".to_string()]);
        assert_eq!(harness.current_flow_id(&ctx), Some("booking".to_string()));
        assert_eq!(ctx.flow_stack.len(), 1);
        assert!(!ctx.attributes.did_transition);
    }

    #[test]
    fn test_switch_default_outcome() {
        let harness = Fixture {
            flows: vec![routed_booking_flow()],
            evaluator: ScopedEvaluator::new().with_variable("booking.express", false),
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{nav.book}"), Some("booking"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/booking/standard.xhtml"));
    }

    #[test]
    fn test_failed_speculative_entry_is_rolled_back() {
        let broken = Flow::new("", "broken")
            .with_start_node("route")
            .with_node(switch_node("route", &[("#{never}", "nowhere")], None));
        let harness = Fixture {
            flows: vec![broken],
            known_views: Some(vec!["/index.xhtml"]),
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{nav.go}"), Some("broken"), "")
            .unwrap();

        assert_eq!(result, NavigationResult::Unresolved);
        assert_eq!(harness.flow_handler.transitions(), vec!["<none> -> broken".to_string()]);
        assert_eq!(harness.flow_handler.rollbacks(), 1);
        assert!(ctx.flow_stack.is_empty());
        assert_eq!(harness.current_flow_id(&ctx), None);
        assert!(!ctx.attributes.did_transition);
    }

    #[test]
    fn test_entry_is_rolled_back_when_redirect_fails() {
        let harness = Fixture {
            flows: vec![routed_booking_flow()],
            evaluator: ScopedEvaluator::new().with_variable("booking.express", true),
            failing_redirects: true,
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");
        ctx.set_processing_view_action(true);

        let err = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{nav.book}"), Some("booking"), "")
            .unwrap_err();

        assert!(matches!(
            err,
            NavigationError::Redirect { ref url, .. } if url.starts_with("/booking/express.xhtml")
        ));
        assert_eq!(harness.flow_handler.transitions(), vec!["<none> -> booking".to_string()]);
        assert_eq!(harness.flow_handler.rollbacks(), 1);
        assert!(ctx.flow_stack.is_empty());
        assert_eq!(harness.current_flow_id(&ctx), None);
        assert_eq!(ctx.view_id(), Some("/index.xhtml"));
        assert!(!ctx.is_response_complete());
        assert!(!ctx.attributes.did_transition);
    }

    #[test]
    fn test_get_navigation_case_leaves_flow_state_untouched() {
        let harness = Fixture {
            flows: vec![routed_booking_flow()],
            evaluator: ScopedEvaluator::new().with_variable("booking.express", true),
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let case = harness
            .handler
            .get_navigation_case(&mut ctx, Some("#{nav.book}"), Some("booking"), "")
            .unwrap()
            .expect("entering the flow should resolve");

        assert_eq!(case.raw_to_view_id(), "/booking/express.xhtml");
        assert!(ctx.flow_stack.is_empty());
        assert!(!ctx.attributes.did_transition);
        assert_eq!(ctx.attributes.reset_flow_handler_state, None);
        assert_eq!(ctx.view_id(), Some("/index.xhtml"));
    }

    #[test]
    fn test_flow_without_nodes_uses_implicit_start_view() {
        let harness = Fixture {
            flows: vec![Flow::new("", "survey")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, None, Some("survey"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/survey/survey.xhtml"));
        assert_eq!(harness.current_flow_id(&ctx), Some("survey".to_string()));
    }

    #[test]
    fn test_explicit_rule_naming_a_flow_enters_it() {
        let harness = Fixture {
            rules: vec![rule("/index.xhtml", "book", "/booking")],
            flows: vec![simple_flow("booking")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        let result = harness
            .handler
            .handle_navigation(&mut ctx, None, Some("book"), "")
            .unwrap();

        assert_eq!(result.view_id(), Some("/booking/booking.xhtml"));
        assert_eq!(harness.current_flow_id(&ctx), Some("booking".to_string()));
        assert!(ctx
            .resolution_trace()
            .steps()
            .iter()
            .any(|step| step.strategy == Strategy::ExplicitFlowEntry && step.view_id.is_some()));
    }

    #[test]
    fn test_initializer_and_finalizer_run() {
        let initialized = Arc::new(AtomicUsize::new(0));
        let finalized = Arc::new(AtomicUsize::new(0));
        let (init, fin) = (initialized.clone(), finalized.clone());
        let evaluator = ScopedEvaluator::new()
            .with_method("survey.start", move |_| {
                init.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .with_method("survey.finish", move |_| {
                fin.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            });
        let survey = Flow::new("", "survey")
            .with_initializer("#{survey.start}")
            .with_finalizer("#{survey.finish}");
        let harness = Fixture {
            flows: vec![survey],
            evaluator,
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");

        harness.handler.navigate(&mut ctx, None, Some("survey")).unwrap();
        assert_eq!(initialized.load(Ordering::SeqCst), 1);
        assert!(harness.flow_handler.inner().is_active(&ctx, "", "survey"));

        // Leaving the flow's directory abandons it.
        let result = harness.handler.navigate(&mut ctx, None, Some("/home")).unwrap();
        assert_eq!(result.view_id(), Some("/home.xhtml"));
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert!(ctx.flow_stack.is_empty());
    }
}

#[cfg(test)]
mod flow_node_tests {
    use super::*;

    #[test]
    fn test_view_node_inside_flow() {
        let booking = simple_flow("booking").with_node(view_node("details", "/booking/details.xhtml"));
        let harness = Fixture {
            flows: vec![booking],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{booking.next}"), Some("details"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/booking/details.xhtml"));
        assert_eq!(ctx.flow_stack.len(), 1);
    }

    #[test]
    fn test_implicit_view_inside_flow_stays_in_flow() {
        let harness = Fixture {
            flows: vec![simple_flow("booking")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, None, Some("review"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/booking/review.xhtml"));
        assert_eq!(harness.current_flow_id(&ctx), Some("booking".to_string()));
    }

    #[test]
    fn test_method_call_node_outcome() {
        let checkout = simple_flow("checkout")
            .with_node(method_call_node("pay", "#{cart.pay}", None))
            .with_node(view_node("paid", "/checkout/paid.xhtml"));
        let harness = Fixture {
            flows: vec![checkout],
            evaluator: ScopedEvaluator::new().with_method("cart.pay", |_| Ok(Value::from("paid"))),
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/checkout/checkout.xhtml", &["checkout"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{cart.submit}"), Some("pay"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/checkout/paid.xhtml"));
        assert_eq!(harness.current_flow_id(&ctx), Some("checkout".to_string()));
    }

    #[test]
    fn test_method_call_null_result_uses_fallback_outcome() {
        let checkout = simple_flow("checkout")
            .with_node(method_call_node("pay", "#{cart.pay}", Some("failed")))
            .with_node(view_node("failed", "/checkout/failed.xhtml"));
        let harness = Fixture {
            flows: vec![checkout],
            evaluator: ScopedEvaluator::new().with_method("cart.pay", |_| Ok(Value::Null)),
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/checkout/checkout.xhtml", &["checkout"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{cart.submit}"), Some("pay"), "")
            .unwrap();
        assert_eq!(result.view_id(), Some("/checkout/failed.xhtml"));
    }

    #[test]
    fn test_failing_method_is_an_error() {
        let checkout = simple_flow("checkout").with_node(method_call_node("pay", "#{cart.pay}", None));
        let harness = Fixture {
            flows: vec![checkout],
            evaluator: ScopedEvaluator::new()
                .with_method("cart.pay", |_| Err("card declined".to_string())),
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/checkout/checkout.xhtml", &["checkout"]);

        let err = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{cart.submit}"), Some("pay"), "")
            .unwrap_err();
        assert!(matches!(err, NavigationError::Evaluation { .. }));
        assert_eq!(ctx.view_id(), Some("/checkout/checkout.xhtml"));
    }

    #[test]
    fn test_flow_call_passes_parameters() {
        let outer = simple_flow("outer").with_node(flow_call_node(
            "callInner",
            "inner",
            &[("name", "#{outer.name}")],
        ));
        let inner = simple_flow("inner").with_inbound_parameter(Parameter::new("name", "#{inner.name}"));
        let harness = Fixture {
            flows: vec![outer, inner],
            evaluator: ScopedEvaluator::new().with_variable("outer.name", "Ada"),
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/outer/outer.xhtml", &["outer"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{outer.call}"), Some("callInner"), "")
            .unwrap();

        assert_eq!(result.view_id(), Some("/inner/inner.xhtml"));
        assert_eq!(ctx.flow_stack.len(), 2);
        assert_eq!(harness.current_flow_id(&ctx), Some("inner".to_string()));
        assert_eq!(harness.evaluator.get("inner.name"), Value::from("Ada"));
    }

    #[test]
    fn test_flow_rules_shadow_root_rules() {
        let booking = simple_flow("booking").with_navigation_rule(rule("*", "help", "/booking/help.xhtml"));
        let harness = Fixture {
            rules: vec![rule("*", "help", "/help.xhtml")],
            flows: vec![booking],
            ..Fixture::default()
        }
        .build();

        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);
        let result = harness.handler.navigate(&mut ctx, None, Some("help")).unwrap();
        assert_eq!(result.view_id(), Some("/booking/help.xhtml"));
        assert!(harness.handler.navigation_cases(&ctx).get("*").is_some());

        let mut ctx = RequestContext::for_view("/index.xhtml");
        let result = harness.handler.navigate(&mut ctx, None, Some("help")).unwrap();
        assert_eq!(result.view_id(), Some("/help.xhtml"));
    }

    #[test]
    fn test_self_referencing_switch_hits_recursion_limit() {
        let spinning = simple_flow("spin").with_node(switch_node("loop", &[], Some("loop")));
        let harness = Fixture {
            flows: vec![spinning],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/spin/spin.xhtml", &["spin"]);

        let err = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{spin.go}"), Some("loop"), "")
            .unwrap_err();
        assert!(matches!(
            err,
            NavigationError::RecursionLimit { limit, .. } if limit == MAX_RESOLUTION_DEPTH
        ));
    }
}

#[cfg(test)]
mod flow_exit_tests {
    use super::*;

    #[test]
    fn test_return_falls_back_to_calling_flow_view() {
        let outer = simple_flow("outer");
        let inner = simple_flow("inner").with_node(return_node("exit", "missing"));
        let harness = Fixture {
            flows: vec![outer, inner],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/inner/inner.xhtml", &["outer", "inner"]);

        let result = harness
            .handler
            .handle_navigation(&mut ctx, Some("#{inner.exit}"), Some("exit"), "")
            .unwrap();

        assert_eq!(result.view_id(), Some("/outer/outer.xhtml"));
        assert_eq!(harness.current_flow_id(&ctx), Some("outer".to_string()));
        assert_eq!(harness.flow_handler.return_mode_pushes(), 1);
        assert_eq!(harness.flow_handler.return_mode_pops(), 1);
        assert_eq!(ctx.flow_stack.return_depth(), 0);
        assert_eq!(ctx.attributes.max_return_depth, None);
    }

    #[test]
    fn test_return_through_root_rule_leaves_flow() {
        let booking = simple_flow("booking").with_node(return_node("done", "home"));
        let harness = Fixture {
            rules: vec![rule("*", "home", "/home.xhtml")],
            flows: vec![booking],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness.handler.navigate(&mut ctx, None, Some("done")).unwrap();

        assert_eq!(result.view_id(), Some("/home.xhtml"));
        assert!(ctx.flow_stack.is_empty());
        assert_eq!(harness.current_flow_id(&ctx), None);
    }

    #[test]
    fn test_return_redirect_announces_exit() {
        let booking = simple_flow("booking").with_node(return_node("done", "home"));
        let home = NavigationRule::new("*").case(
            NavigationCase::new("*", "/home.xhtml")
                .with_from_outcome("home")
                .with_redirect(true),
        );
        let harness = Fixture {
            rules: vec![home],
            flows: vec![booking],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness.handler.navigate(&mut ctx, None, Some("done")).unwrap();

        let url = "/home.xhtml?jakarta.faces.flow.documentId=jakarta.faces.flow.NULL_FLOW&jakarta.faces.flow.id=&jffrd=1";
        assert_eq!(
            result,
            NavigationResult::Redirect {
                view_id: "/home.xhtml".to_string(),
                url: url.to_string(),
            }
        );
        // The flow is left when the redirected request arrives.
        assert_eq!(ctx.flow_stack.len(), 1);

        let mut next = harness.request_in("/home.xhtml", &["booking"]);
        next.set_request_parameter(TO_FLOW_DOCUMENT_ID_PARAM, NULL_FLOW);
        next.set_request_parameter(FLOW_ID_PARAM, "");
        next.set_request_parameter(FLOW_RETURN_DEPTH_PARAM, "1");
        harness
            .flow_handler
            .inner()
            .client_window_transition(&mut next)
            .unwrap();
        assert!(next.flow_stack.is_empty());
    }

    #[test]
    fn test_outcome_outside_flow_directory_abandons_flow() {
        let harness = Fixture {
            flows: vec![simple_flow("booking")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness
            .handler
            .navigate(&mut ctx, None, Some("/home?faces-redirect=true"))
            .unwrap();

        let NavigationResult::Redirect { url, .. } = result else {
            panic!("expected a redirect, got {:?}", result);
        };
        assert_eq!(
            url,
            format!(
                "/home.xhtml?{}={}&{}=",
                TO_FLOW_DOCUMENT_ID_PARAM, ABANDONED_FLOW, FLOW_ID_PARAM
            )
        );

        let mut next = harness.request_in("/home.xhtml", &["booking"]);
        next.set_request_parameter(TO_FLOW_DOCUMENT_ID_PARAM, ABANDONED_FLOW);
        next.set_request_parameter(FLOW_ID_PARAM, "");
        harness
            .flow_handler
            .inner()
            .client_window_transition(&mut next)
            .unwrap();
        assert!(next.flow_stack.is_empty());
    }

    #[test]
    fn test_abandoned_flow_falls_back_to_root_rules() {
        let harness = Fixture {
            rules: vec![rule("*", "leave", "/home.xhtml")],
            flows: vec![simple_flow("booking")],
            known_views: Some(vec!["/booking/booking.xhtml", "/home.xhtml"]),
            ..Fixture::default()
        }
        .build();
        let mut ctx = harness.request_in("/booking/booking.xhtml", &["booking"]);

        let result = harness.handler.navigate(&mut ctx, None, Some("leave")).unwrap();

        assert_eq!(result.view_id(), Some("/home.xhtml"));
        assert!(ctx.flow_stack.is_empty());
        assert_eq!(
            TraceFormatter::format_reason(ctx.resolution_trace()),
            "root rules after abandoning flow for outcome 'leave' -> /home.xhtml"
        );
    }

    #[test]
    fn test_redirect_into_flow_names_it() {
        let home = NavigationRule::new("/index.xhtml").case(
            NavigationCase::new("/index.xhtml", "/booking")
                .with_from_outcome("book"),
        );
        let harness = Fixture {
            rules: vec![home],
            flows: vec![simple_flow("booking")],
            ..Fixture::default()
        }
        .build();
        let mut ctx = RequestContext::for_view("/index.xhtml");
        ctx.set_processing_view_action(true);

        let result = harness.handler.navigate(&mut ctx, None, Some("book")).unwrap();

        let NavigationResult::Redirect { url, .. } = result else {
            panic!("expected a redirect, got {:?}", result);
        };
        assert_eq!(
            url,
            format!(
                "/booking/booking.xhtml?{}=&{}=booking",
                TO_FLOW_DOCUMENT_ID_PARAM, FLOW_ID_PARAM
            )
        );
        assert!(ctx.flow_stack.is_empty());
    }
}
