//! Concurrency scenarios the registry needs to survive. Constructors are
//! slowed down or held on a [Gate] to force threads to meet inside them.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rstest::rstest;

use crate::{Config, DefaultServiceFactory, Error, ResolveState, ServiceName, Services};

use self::fixtures::{CountingFactory, Gate};

/// Resolves a service and returns the address of its instance.
fn handle_ptr(services: &Services, name: ServiceName) -> usize {
    match name {
        ServiceName::Config => Arc::as_ptr(&services.config().unwrap()) as *const () as usize,
        ServiceName::Classify => Arc::as_ptr(&services.classify().unwrap()) as *const () as usize,
        ServiceName::NsfwDetector => {
            Arc::as_ptr(&services.nsfw_detector().unwrap()) as *const () as usize
        }
        ServiceName::Convert => Arc::as_ptr(&services.convert().unwrap()) as *const () as usize,
        ServiceName::Files => Arc::as_ptr(&services.files().unwrap()) as *const () as usize,
        ServiceName::Index => Arc::as_ptr(&services.index().unwrap()) as *const () as usize,
    }
}

/// Asserts the index was built from exactly the instances the accessors hand out.
fn assert_index_wired(services: &Services) {
    let index = services.index().unwrap();
    let deps = index.dependencies();
    assert!(Arc::ptr_eq(&deps.config, &services.config().unwrap()));
    assert!(Arc::ptr_eq(&deps.classify, &services.classify().unwrap()));
    assert!(Arc::ptr_eq(
        &deps.nsfw_detector,
        &services.nsfw_detector().unwrap()
    ));
    assert!(Arc::ptr_eq(&deps.convert, &services.convert().unwrap()));
    assert!(Arc::ptr_eq(&deps.files, &services.files().unwrap()));
}

#[rstest]
#[case::config(ServiceName::Config)]
#[case::classify(ServiceName::Classify)]
#[case::nsfw_detector(ServiceName::NsfwDetector)]
#[case::convert(ServiceName::Convert)]
#[case::files(ServiceName::Files)]
#[case::index(ServiceName::Index)]
fn singleton_identity(#[case] name: ServiceName) {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.delay(Duration::from_millis(20))).unwrap();
    let barrier = Barrier::new(16);

    let ptrs: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    handle_ptr(&services, name)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ptrs.windows(2).all(|w| w[0] == w[1]), "all callers share one instance");
    assert_eq!(1, counters.get(name));
    for dep in name.dependencies() {
        assert_eq!(1, counters.get(*dep), "{dep} constructed once");
    }
    assert_eq!(ResolveState::Resolved, services.state(name));
}

/// Two threads ask for the index while a third asks for the classifier.
#[test]
fn two_index_callers_and_one_classify_caller() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.delay(Duration::from_millis(10))).unwrap();
    let barrier = Barrier::new(3);

    let (index_a, index_b, classify) = thread::scope(|s| {
        let a = s.spawn(|| {
            barrier.wait();
            services.index().unwrap()
        });
        let b = s.spawn(|| {
            barrier.wait();
            services.index().unwrap()
        });
        let c = s.spawn(|| {
            barrier.wait();
            services.classify().unwrap()
        });
        (a.join().unwrap(), b.join().unwrap(), c.join().unwrap())
    });

    assert!(Arc::ptr_eq(&index_a, &index_b));
    assert!(Arc::ptr_eq(&classify, &index_a.dependencies().classify));
    for name in ServiceName::ALL {
        assert_eq!(1, counters.get(name), "{name} constructed once");
    }
}

#[test]
fn index_receives_resolved_dependencies() {
    let (factory, _) = CountingFactory::new();
    let services = Services::new(factory).unwrap();

    services.index().unwrap();
    assert_index_wired(&services);
}

#[test]
fn reaccess_never_constructs_again() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory).unwrap();
    services.warm_up().expect("warm up must succeed");

    for _ in 0..1000 {
        for name in ServiceName::ALL {
            services.resolve(name).unwrap();
        }
    }
    for name in ServiceName::ALL {
        assert_eq!(1, counters.get(name));
    }
}

#[test]
fn resolving_does_not_block_other_accessors() {
    let gate = Gate::new();
    let (factory, _) = CountingFactory::new();
    let services = Services::new(factory.gated(ServiceName::Convert, gate.clone())).unwrap();

    thread::scope(|s| {
        let convert = s.spawn(|| services.convert());

        gate.entered.wait();
        assert_eq!(ResolveState::Resolving, services.state(ServiceName::Convert));
        // config was resolved on the way in, the other leaves are independent
        assert_eq!(ResolveState::Resolved, services.state(ServiceName::Config));
        services.nsfw_detector().expect("unrelated accessor must not wait");
        services.files().expect("unrelated accessor must not wait");
        assert_eq!(ResolveState::Unresolved, services.state(ServiceName::Index));

        gate.release.wait();
        convert.join().unwrap().expect("convert must resolve");
    });

    assert_eq!(ResolveState::Resolved, services.state(ServiceName::Convert));
}

#[test]
fn callers_wait_for_the_running_construction() {
    let gate = Gate::new();
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.gated(ServiceName::Files, gate.clone())).unwrap();

    thread::scope(|s| {
        let first = s.spawn(|| handle_ptr(&services, ServiceName::Files));
        gate.entered.wait();

        let second = s.spawn(|| handle_ptr(&services, ServiceName::Files));
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished(), "second caller must wait");

        gate.release.wait();
        assert_eq!(first.join().unwrap(), second.join().unwrap());
    });

    assert_eq!(1, counters.get(ServiceName::Files));
}

#[test]
fn failure_is_cached_and_propagated() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.failing(ServiceName::Classify)).unwrap();

    for _ in 0..3 {
        match services.classify() {
            Err(Error::Failed { service, .. }) => assert_eq!(ServiceName::Classify, service),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("classify must fail"),
        }
    }
    assert_eq!(1, counters.get(ServiceName::Classify));

    let err = services.index().err().expect("index must fail");
    match &err {
        Error::Dependency {
            service,
            dependency,
            ..
        } => {
            assert_eq!(ServiceName::Index, *service);
            assert_eq!(ServiceName::Classify, *dependency);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(Some(ServiceName::Classify), err.root_service());
    assert_eq!(0, counters.get(ServiceName::Index));

    // unrelated services are unaffected
    services.nsfw_detector().expect("nsfw detector must resolve");

    assert_eq!(ResolveState::Failed, services.state(ServiceName::Classify));
    assert_eq!(ResolveState::Failed, services.state(ServiceName::Index));
    assert_eq!(ResolveState::Resolved, services.state(ServiceName::NsfwDetector));
    assert!(services.resolved_index().is_none());
}

#[test]
fn invalid_config_fails_every_accessor() {
    let services = Services::new(DefaultServiceFactory::with_config(Config {
        workers: 0,
        ..Default::default()
    }))
    .unwrap();

    let err = services.warm_up().expect_err("warm up must surface the failure");
    assert_eq!(Some(ServiceName::Config), err.root_service());

    for name in ServiceName::ALL {
        let err = services.resolve(name).expect_err("must fail");
        assert_eq!(Some(ServiceName::Config), err.root_service());
        assert_eq!(ResolveState::Failed, services.state(name));
    }
    assert!(services.resolved_config().is_none());
}

#[test]
fn panic_poisons_without_retry() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.panicking(ServiceName::Convert)).unwrap();

    let res = catch_unwind(AssertUnwindSafe(|| services.convert()));
    assert!(res.is_err(), "the panic reaches the first caller");

    assert!(matches!(
        services.convert(),
        Err(Error::Poisoned(ServiceName::Convert))
    ));
    assert_eq!(1, counters.get(ServiceName::Convert));
    assert_eq!(ResolveState::Failed, services.state(ServiceName::Convert));

    let err = services.index().err().expect("index depends on convert");
    assert_eq!(Some(ServiceName::Convert), err.root_service());
}

#[test]
fn waiting_callers_observe_the_panic() {
    let gate = Gate::new();
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(
        factory
            .panicking(ServiceName::Convert)
            .gated(ServiceName::Convert, gate.clone()),
    )
    .unwrap();

    thread::scope(|s| {
        let first = s.spawn(|| services.convert());
        gate.entered.wait();

        let second = s.spawn(|| services.convert());
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished(), "second caller must wait");

        gate.release.wait();
        assert!(first.join().is_err(), "the panic reaches the constructing thread");
        assert!(matches!(
            second.join().unwrap(),
            Err(Error::Poisoned(ServiceName::Convert))
        ));
    });

    assert_eq!(1, counters.get(ServiceName::Convert));
    assert_eq!(ResolveState::Failed, services.state(ServiceName::Convert));
}

/// A dependency panicking underneath the first index caller must not take the
/// index guard down with it.
#[test]
fn dependency_panic_leaves_index_unpoisoned() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory.panicking(ServiceName::Convert)).unwrap();

    let res = catch_unwind(AssertUnwindSafe(|| services.index()));
    assert!(res.is_err(), "the panic reaches the first index caller");
    assert_eq!(ResolveState::Unresolved, services.state(ServiceName::Index));

    let err = services.index().err().expect("index depends on convert");
    match &err {
        Error::Dependency {
            service,
            dependency,
            source,
        } => {
            assert_eq!(ServiceName::Index, *service);
            assert_eq!(ServiceName::Convert, *dependency);
            assert!(matches!(**source, Error::Poisoned(ServiceName::Convert)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(Some(ServiceName::Convert), err.root_service());

    assert_eq!(1, counters.get(ServiceName::Convert));
    assert_eq!(0, counters.get(ServiceName::Index));
    assert_eq!(ResolveState::Failed, services.state(ServiceName::Index));
}

#[test]
fn warm_up_resolves_everything() {
    let (factory, counters) = CountingFactory::new();
    let services = Services::new(factory).unwrap();

    assert!(services
        .states()
        .values()
        .all(|state| *state == ResolveState::Unresolved));

    services.warm_up().expect("warm up must succeed");

    assert!(services
        .states()
        .values()
        .all(|state| *state == ResolveState::Resolved));
    for name in ServiceName::ALL {
        assert_eq!(1, counters.get(name));
    }
    assert!(services.resolved_config().is_some());
    assert!(services.resolved_index().is_some());
}

mod interleavings {
    use proptest::prelude::ProptestConfig;
    use test_strategy::proptest;

    use super::*;

    /// Any mix of concurrent first calls constructs each reachable service
    /// exactly once and leaves everything else untouched.
    #[proptest(ProptestConfig { cases: 32, ..Default::default() })]
    fn concurrent_first_calls(
        #[strategy(proptest::collection::vec(0..ServiceName::ALL.len(), 1..12))] calls: Vec<
            usize,
        >,
    ) {
        let (factory, counters) = CountingFactory::new();
        let services = Services::new(factory.delay(Duration::from_millis(1))).unwrap();
        let barrier = Barrier::new(calls.len());
        let names: Vec<ServiceName> = calls.iter().map(|i| ServiceName::ALL[*i]).collect();

        thread::scope(|s| {
            for name in names.iter() {
                let services = &services;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    services.resolve(*name).unwrap();
                });
            }
        });

        for name in ServiceName::ALL {
            let reached = names
                .iter()
                .any(|called| *called == name || called.dependencies().contains(&name));
            assert_eq!(usize::from(reached), counters.get(name), "{name}");
        }
        if names.contains(&ServiceName::Index) {
            assert_index_wired(&services);
        }
    }
}
