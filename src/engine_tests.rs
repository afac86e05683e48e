use super::*;
use crate::config::CacheConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn cache_with<F: FnOnce(&mut CacheConfig)>(configure: F) -> MemoryCache<String, i32> {
    let mut config = CacheConfig::default();
    configure(&mut config);
    MemoryCache::with_config(config).expect("cache construction should not fail in tests")
}

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while !predicate() {
        if start.elapsed() > timeout {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

#[test]
fn scenario_basic_lru() {
    let cache = cache_with(|c| c.count_limit = Some(2));
    cache.put("a".into(), 1);
    cache.put("b".into(), 2);
    cache.put("c".into(), 3);

    assert!(wait_until(|| cache.total_count() == 2, Duration::from_secs(2)));
    assert_eq!(cache.get(&"a".to_string()), None);
    assert_eq!(cache.get(&"b".to_string()), Some(2));
    assert_eq!(cache.get(&"c".to_string()), Some(3));
}

#[test]
fn scenario_access_refreshes_recency() {
    let cache = cache_with(|c| c.count_limit = Some(2));
    cache.put("a".into(), 1);
    cache.put("b".into(), 2);
    let _ = cache.get(&"a".to_string());
    cache.put("c".into(), 3);

    assert!(wait_until(|| cache.total_count() == 2, Duration::from_secs(2)));
    assert_eq!(cache.get(&"b".to_string()), None);
    assert_eq!(cache.get(&"a".to_string()), Some(1));
    assert_eq!(cache.get(&"c".to_string()), Some(3));
}

#[test]
fn scenario_cost_bound_after_sweep() {
    let cache = cache_with(|c| {
        c.cost_limit = Some(10);
        c.auto_trim_interval = Duration::from_millis(20);
    });
    cache.put_with_cost("x".into(), 100, 6);
    cache.put_with_cost("y".into(), 200, 6);

    assert!(wait_until(|| cache.total_cost() <= 10, Duration::from_secs(2)));
    assert_eq!(cache.get(&"x".to_string()), None);
}

#[test]
fn scenario_age_bound_after_sweep() {
    let cache = cache_with(|c| {
        c.age_limit = Some(Duration::from_millis(50));
        c.auto_trim_interval = Duration::from_millis(20);
    });
    cache.put("k".into(), 1);
    thread::sleep(Duration::from_millis(120));

    assert!(wait_until(
        || !cache.contains(&"k".to_string()),
        Duration::from_secs(2)
    ));
}

#[test]
fn scenario_replace_updates_cost_not_adds() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    cache.put_with_cost("k".into(), 1, 5);
    cache.put_with_cost("k".into(), 2, 2);

    assert_eq!(cache.total_cost(), 2);
    assert_eq!(cache.total_count(), 1);
    assert_eq!(cache.get(&"k".to_string()), Some(2));
}

#[test]
fn scenario_external_memory_warning_purges() {
    let cache = cache_with(|c| c.remove_all_on_memory_warning = true);
    cache.put("a".into(), 1);
    cache.put("b".into(), 2);

    cache.on_memory_warning();

    assert_eq!(cache.total_count(), 0);
}

#[test]
fn memory_warning_respects_disabled_policy() {
    let cache = cache_with(|c| c.remove_all_on_memory_warning = false);
    cache.put("a".into(), 1);

    cache.on_memory_warning();

    assert_eq!(cache.total_count(), 1);
}

#[test]
fn memory_warning_callback_runs_outside_lock() {
    let cache = cache_with(|c| c.remove_all_on_memory_warning = false);
    cache.put("a".into(), 1);

    let invoked = Arc::new(AtomicUsize::new(0));
    let invoked_clone = Arc::clone(&invoked);
    cache.set_memory_warning_callback(Some(Arc::new(move || {
        invoked_clone.fetch_add(1, Ordering::SeqCst);
    })));

    cache.on_memory_warning();

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    // Policy still disabled: callback alone does not purge.
    assert_eq!(cache.total_count(), 1);
}

#[test]
fn idempotent_remove() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    cache.put("k".into(), 1);

    cache.remove(&"k".to_string());
    cache.remove(&"k".to_string());

    assert_eq!(cache.total_count(), 0);
    assert_eq!(cache.get(&"k".to_string()), None);
}

#[test]
fn count_overflow_is_reconciled_by_the_trim_worker() {
    let cache = cache_with(|c| c.count_limit = Some(3));
    cache.put("a".into(), 1);
    cache.put("b".into(), 2);
    cache.put("c".into(), 3);
    cache.put("d".into(), 4);

    assert!(wait_until(|| cache.total_count() == 3, Duration::from_secs(2)));
    assert_eq!(cache.get(&"a".to_string()), None);
}

#[test]
fn tightening_count_limit_below_current_size_does_not_panic() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    for i in 0..100 {
        cache.put(i.to_string(), i);
    }

    cache.set_count_limit(Some(2));
    cache.put("trigger".into(), 999);

    assert!(wait_until(|| cache.total_count() <= 2, Duration::from_secs(2)));
}

#[test]
fn trim_to_count_zero_is_remove_all() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    cache.put("a".into(), 1);
    cache.put("b".into(), 2);

    cache.trim_to_count(0);

    assert_eq!(cache.total_count(), 0);
}

#[test]
fn trim_to_cost_zero_is_remove_all() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    cache.put_with_cost("a".into(), 1, 4);

    cache.trim_to_cost(0);

    assert_eq!(cache.total_count(), 0);
}

#[test]
fn explicit_trim_to_age_evicts_stale_entries() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    cache.put("a".into(), 1);
    thread::sleep(Duration::from_millis(30));
    cache.put("b".into(), 2);

    cache.trim_to_age(Duration::from_millis(15));

    assert_eq!(cache.get(&"a".to_string()), None);
    assert_eq!(cache.get(&"b".to_string()), Some(2));
}

#[test]
fn concurrent_put_get_remove_preserve_bounds() {
    let cache = Arc::new(cache_with(|c| c.count_limit = Some(256)));
    let mut handles = vec![];

    for t in 0..8u64 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..500u64 {
                let key = format!("{t}-{i}");
                cache.put(key.clone(), (t * 1000 + i) as i32);
                let _ = cache.get(&key);
                if i % 4 == 0 {
                    cache.remove(&key);
                }
            }
        }));
    }

    for h in handles {
        h.join().expect("worker thread panicked");
    }

    assert!(wait_until(
        || cache.total_count() <= 256,
        Duration::from_secs(2)
    ));
}

#[test]
fn drain_main_thread_queue_is_noop_without_pending_work() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    assert_eq!(cache.drain_main_thread_queue(), 0);
}

#[test]
fn main_thread_release_defers_until_drained() {
    let cache = cache_with(|c| c.release_on_main_thread = true);
    cache.put("a".into(), 1);
    cache.remove(&"a".to_string());

    // The release job is parked, not yet run; draining doesn't change any
    // cache-observable state here (there's nothing left to observe besides
    // the job count), but it should not panic and should report one job.
    assert_eq!(cache.drain_main_thread_queue(), 1);
}

#[test]
fn limit_getters_reflect_constructor_defaults() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();
    assert_eq!(cache.count_limit(), None);
    assert_eq!(cache.cost_limit(), None);
    assert_eq!(cache.age_limit(), None);
    assert_eq!(cache.auto_trim_interval(), Duration::from_secs(5));
    assert_eq!(cache.name(), None);
    assert!(cache.remove_all_on_memory_warning());
    assert!(cache.remove_all_on_enter_background());
    assert!(!cache.release_on_main_thread());
    assert!(cache.release_asynchronously());
}

#[test]
fn limit_getters_reflect_setters() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();

    cache.set_count_limit(Some(10));
    cache.set_cost_limit(Some(500));
    cache.set_age_limit(Some(Duration::from_secs(30)));
    cache.set_auto_trim_interval(Duration::from_millis(250));
    cache.set_name(Some("sessions".to_string()));

    assert_eq!(cache.count_limit(), Some(10));
    assert_eq!(cache.cost_limit(), Some(500));
    assert_eq!(cache.age_limit(), Some(Duration::from_secs(30)));
    assert_eq!(cache.auto_trim_interval(), Duration::from_millis(250));
    assert_eq!(cache.name(), Some("sessions".to_string()));
}

#[test]
fn purge_and_release_policy_setters_take_effect() {
    let cache: MemoryCache<String, i32> = MemoryCache::new();

    cache.set_remove_all_on_memory_warning(false);
    cache.set_remove_all_on_enter_background(false);
    cache.set_release_on_main_thread(true);
    cache.set_release_asynchronously(false);

    assert!(!cache.remove_all_on_memory_warning());
    assert!(!cache.remove_all_on_enter_background());
    assert!(cache.release_on_main_thread());
    assert!(!cache.release_asynchronously());

    cache.put("a".into(), 1);
    cache.on_memory_warning();
    cache.on_enter_background();
    assert_eq!(cache.total_count(), 1, "both purge policies were disabled");
}
