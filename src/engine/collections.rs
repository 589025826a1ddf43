// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Collection combinators built on the iteration driver.
//!
//! Each combinator maps its own semantics onto [`drive`]: results are placed by
//! element position (never by completion order), predicates short-circuit with
//! `ControlFlow::Break`, and the first error aborts the whole operation.
//!
//! Filter-style combinators hand the unit an owned element and keep a clone to
//! return, so they require `T: Clone`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::hash::Hash;
use std::ops::ControlFlow;

use crate::config::Limit;
use crate::engine::iteration::{drive, Exit};

fn place<R>(slots: &mut Vec<Option<R>>, index: usize, value: R) {
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    slots[index] = Some(value);
}

/// Transform every element; the output keeps the input's positions.
///
/// ```rust
/// use std::time::Duration;
/// use the_cadence::config::Limit;
/// use the_cadence::engine::map;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let doubled: Result<Vec<u64>, String> = map(vec![30, 10, 20], Limit::UNBOUNDED, |ms| async move {
///     tokio::time::sleep(Duration::from_millis(ms)).await;
///     Ok(ms * 2)
/// })
/// .await;
///
/// assert_eq!(doubled.unwrap(), vec![60, 20, 40]);
/// # }
/// ```
pub async fn map<I, T, R, E, F, Fut>(items: I, limit: Limit, mut unit: F) -> Result<Vec<R>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let entries = items.into_iter().enumerate();
    let mut slots: Vec<Option<R>> = Vec::with_capacity(entries.size_hint().0);

    drive(
        entries,
        limit,
        |_, item| {
            let pending = unit(item);
            async move { pending.await.map(ControlFlow::<(), R>::Continue) }
        },
        |index, value| place(&mut slots, index, value),
    )
    .await?;

    Ok(slots.into_iter().flatten().collect())
}

/// Transform every value of a map, keeping each value under its key.
pub async fn map_values<K, V, R, E, F, Fut, S>(
    entries: HashMap<K, V, S>,
    limit: Limit,
    mut unit: F,
) -> Result<HashMap<K, R>, E>
where
    K: Eq + Hash + Clone,
    F: FnMut(K, V) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut mapped = HashMap::with_capacity(entries.len());

    drive(
        entries.into_iter(),
        limit,
        |key, value| {
            let pending = unit(key, value);
            async move { pending.await.map(ControlFlow::<(), R>::Continue) }
        },
        |key, value| {
            mapped.insert(key, value);
        },
    )
    .await?;

    Ok(mapped)
}

async fn retain<I, T, E, F, Fut>(
    items: I,
    limit: Limit,
    mut test: F,
    keep_when: bool,
) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut kept: Vec<(usize, T)> = Vec::new();

    drive(
        items.into_iter().enumerate(),
        limit,
        |_, item: T| {
            let candidate = item.clone();
            let pending = test(item);
            async move {
                pending
                    .await
                    .map(|verdict| ControlFlow::<(), _>::Continue((verdict == keep_when).then_some(candidate)))
            }
        },
        |index, survivor| {
            if let Some(item) = survivor {
                kept.push((index, item));
            }
        },
    )
    .await?;

    kept.sort_by_key(|(index, _)| *index);
    Ok(kept.into_iter().map(|(_, item)| item).collect())
}

/// Keep the elements whose test yields `true`, in original order.
pub async fn filter<I, T, E, F, Fut>(items: I, limit: Limit, test: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    retain(items, limit, test, true).await
}

/// Keep the elements whose test yields `false`, in original order.
pub async fn reject<I, T, E, F, Fut>(items: I, limit: Limit, test: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    retain(items, limit, test, false).await
}

/// Return the first element, in completion order, whose test yields `true`.
///
/// With a limit above one this is the first to *pass*, not the first in
/// position. `None` means nothing passed.
pub async fn detect<I, T, E, F, Fut>(items: I, limit: Limit, mut test: F) -> Result<Option<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let exit = drive(
        items.into_iter().enumerate(),
        limit,
        |_, item: T| {
            let candidate = item.clone();
            let pending = test(item);
            async move {
                pending.await.map(|hit| {
                    if hit {
                        ControlFlow::Break(candidate)
                    } else {
                        ControlFlow::Continue(())
                    }
                })
            }
        },
        |_, ()| {},
    )
    .await?;

    Ok(match exit {
        Exit::Stopped(found) => Some(found),
        Exit::Exhausted => None,
    })
}

async fn short_circuit<I, T, E, F, Fut>(items: I, limit: Limit, mut test: F, stop_on: bool) -> Result<bool, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let exit = drive(
        items.into_iter().enumerate(),
        limit,
        |_, item| {
            let pending = test(item);
            async move {
                pending.await.map(|verdict| {
                    if verdict == stop_on {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                })
            }
        },
        |_, ()| {},
    )
    .await?;

    Ok(matches!(exit, Exit::Stopped(())))
}

/// `true` as soon as any element passes; `false` for an empty input.
pub async fn some<I, T, E, F, Fut>(items: I, limit: Limit, test: F) -> Result<bool, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    short_circuit(items, limit, test, true).await
}

/// `false` as soon as any element fails; `true` for an empty input.
pub async fn every<I, T, E, F, Fut>(items: I, limit: Limit, test: F) -> Result<bool, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    short_circuit(items, limit, test, false)
        .await
        .map(|failed| !failed)
}

/// Bucket elements by the key the unit yields. Within a bucket, elements keep
/// their original relative order.
pub async fn group_by<I, T, K, E, F, Fut>(
    items: I,
    limit: Limit,
    mut key_of: F,
) -> Result<HashMap<K, Vec<T>>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    K: Eq + Hash,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<K, E>>,
{
    let keyed = map(items, limit, |item: T| {
        let member = item.clone();
        let pending = key_of(item);
        async move { pending.await.map(|key| (key, member)) }
    })
    .await?;

    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for (key, member) in keyed {
        groups.entry(key).or_default().push(member);
    }
    Ok(groups)
}

/// Map each element to a sequence and concatenate them in original order.
pub async fn concat<I, T, R, E, F, Fut>(items: I, limit: Limit, unit: F) -> Result<Vec<R>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<Vec<R>, E>>,
{
    let nested = map(items, limit, unit).await?;
    Ok(nested.into_iter().flatten().collect())
}

/// Order elements by a key computed concurrently for every element.
///
/// The sort is stable: elements with equal keys keep their original order.
pub async fn sort_by<I, T, K, E, F, Fut>(items: I, mut key_of: F) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    K: Ord,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<K, E>>,
{
    let mut keyed = map(items, Limit::UNBOUNDED, |item: T| {
        let member = item.clone();
        let pending = key_of(item);
        async move { pending.await.map(|key| (key, member)) }
    })
    .await?;

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(keyed.into_iter().map(|(_, member)| member).collect())
}

/// Fold elements left to right, one step at a time.
///
/// Each step receives the accumulator produced by the previous step. The
/// driver runs in series, so the next element is only pulled once the previous
/// step's accumulator has been put back.
pub async fn reduce<I, T, A, E, F, Fut>(items: I, initial: A, mut step: F) -> Result<A, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(A, T) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let accumulator = RefCell::new(Some(initial));
    let steps = items.into_iter().enumerate().map_while(|(index, item)| {
        let current = accumulator.borrow_mut().take();
        current.map(|acc| (index, (acc, item)))
    });

    drive(
        steps,
        Limit::SERIES,
        |_, (acc, item)| {
            let pending = step(acc, item);
            async move { pending.await.map(ControlFlow::<Infallible, A>::Continue) }
        },
        |_, next| *accumulator.borrow_mut() = Some(next),
    )
    .await?;

    Ok(accumulator
        .into_inner()
        .expect("a series step always returns its accumulator before the next is pulled"))
}

/// [`reduce`] over the elements in reverse order.
pub async fn reduce_right<I, T, A, E, F, Fut>(items: I, initial: A, step: F) -> Result<A, E>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: DoubleEndedIterator,
    F: FnMut(A, T) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    reduce(items.into_iter().rev(), initial, step).await
}

/// Run `unit` for each index in `0..n` and collect the results in index order.
pub async fn times<R, E, F, Fut>(n: usize, limit: Limit, unit: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    map(0..n, limit, unit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::time::sleep;

    async fn after<T>(ms: u64, value: T) -> T {
        sleep(Duration::from_millis(ms)).await;
        value
    }

    #[tokio::test(start_paused = true)]
    async fn map_keeps_positions_regardless_of_completion_order() {
        let out: Result<Vec<u64>, ()> = map(vec![300, 100, 200], Limit::UNBOUNDED, |ms| async move {
            Ok(after(ms, ms * 2).await)
        })
        .await;

        assert_eq!(out, Ok(vec![600, 200, 400]));
    }

    #[tokio::test(start_paused = true)]
    async fn map_reports_first_error() {
        let out = map(vec![1u64, 2, 3], Limit::new(2).unwrap(), |n| async move {
            sleep(Duration::from_millis(n)).await;
            if n == 2 {
                Err(format!("bad {}", n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(out, Err("bad 2".to_string()));
    }

    #[tokio::test]
    async fn map_values_keeps_keys() {
        let mut input = HashMap::new();
        input.insert("a".to_string(), 1);
        input.insert("b".to_string(), 2);

        let out: HashMap<String, String> = map_values(input, Limit::UNBOUNDED, |key, value| async move {
            Ok::<_, ()>(format!("{}={}", key, value))
        })
        .await
        .unwrap();

        assert_eq!(out.get("a").map(String::as_str), Some("a=1"));
        assert_eq!(out.get("b").map(String::as_str), Some("b=2"));
    }

    #[tokio::test(start_paused = true)]
    async fn filter_and_reject_preserve_order() {
        let odd = |n: u64| async move { Ok::<_, ()>(after(10 * (6 - n), n % 2 == 1).await) };

        let kept = filter(vec![1u64, 2, 3, 4, 5], Limit::UNBOUNDED, odd).await;
        let dropped = reject(vec![1u64, 2, 3, 4, 5], Limit::UNBOUNDED, odd).await;

        assert_eq!(kept, Ok(vec![1, 3, 5]));
        assert_eq!(dropped, Ok(vec![2, 4]));
    }

    #[tokio::test(start_paused = true)]
    async fn detect_returns_first_to_pass() {
        let found = detect(vec![30u64, 10, 20], Limit::UNBOUNDED, |ms| async move {
            Ok::<_, ()>(after(ms, ms >= 20).await)
        })
        .await;

        assert_eq!(found, Ok(Some(20)));
    }

    #[tokio::test]
    async fn detect_none_when_nothing_passes() {
        let found = detect(vec![1, 2, 3], Limit::SERIES, |n| async move { Ok::<_, ()>(n > 5) }).await;
        assert_eq!(found, Ok(None));
    }

    #[tokio::test]
    async fn some_short_circuits() {
        let checked = Cell::new(0);
        let any = some(vec![1, 2, 3, 4], Limit::SERIES, |n| {
            checked.set(checked.get() + 1);
            async move { Ok::<_, ()>(n == 2) }
        })
        .await;

        assert_eq!(any, Ok(true));
        assert_eq!(checked.get(), 2);
    }

    #[tokio::test]
    async fn every_on_empty_is_true_and_stops_on_failure() {
        let empty = every(Vec::<i32>::new(), Limit::SERIES, |_| async { Ok::<_, ()>(false) }).await;
        assert_eq!(empty, Ok(true));

        let all = every(vec![2, 4, 5, 6], Limit::SERIES, |n| async move { Ok::<_, ()>(n % 2 == 0) }).await;
        assert_eq!(all, Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn group_by_buckets_in_original_order() {
        let words = vec!["apple", "bean", "avocado", "beet", "cherry"];
        let groups = group_by(words, Limit::new(2).unwrap(), |word: &str| async move {
            let delay = 10 - word.len() as u64;
            Ok::<_, ()>(after(delay, word.chars().next().unwrap_or('?')).await)
        })
        .await
        .unwrap();

        let sorted: BTreeMap<_, _> = groups.into_iter().collect();
        assert_eq!(sorted[&'a'], vec!["apple", "avocado"]);
        assert_eq!(sorted[&'b'], vec!["bean", "beet"]);
        assert_eq!(sorted[&'c'], vec!["cherry"]);
    }

    #[tokio::test]
    async fn concat_flattens_in_order() {
        let out = concat(vec![1, 2, 3], Limit::UNBOUNDED, |n| async move {
            Ok::<_, ()>(vec![n; n])
        })
        .await;

        assert_eq!(out, Ok(vec![1, 2, 2, 3, 3, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn sort_by_is_stable() {
        let items = vec![("b", 2u64), ("a", 1), ("c", 2), ("d", 1)];
        let sorted = sort_by(items, |(_, rank)| async move { Ok::<_, ()>(after(10 / rank, rank).await) })
            .await
            .unwrap();

        assert_eq!(sorted, vec![("a", 1), ("d", 1), ("b", 2), ("c", 2)]);
    }

    #[tokio::test]
    async fn reduce_runs_in_series_and_right_reverses() {
        let left = reduce(vec!["a", "b", "c"], String::new(), |mut acc, s| async move {
            acc.push_str(s);
            Ok::<_, ()>(acc)
        })
        .await;
        let right = reduce_right(vec!["a", "b", "c"], String::new(), |mut acc, s| async move {
            acc.push_str(s);
            Ok::<_, ()>(acc)
        })
        .await;

        assert_eq!(left, Ok("abc".to_string()));
        assert_eq!(right, Ok("cba".to_string()));
    }

    #[tokio::test]
    async fn reduce_stops_at_first_error() {
        let steps = Cell::new(0);
        let out = reduce(vec![1, 2, 3], 0, |acc, n| {
            steps.set(steps.get() + 1);
            async move {
                if n == 2 {
                    Err("halt")
                } else {
                    Ok(acc + n)
                }
            }
        })
        .await;

        assert_eq!(out, Err("halt"));
        assert_eq!(steps.get(), 2);
    }

    #[tokio::test]
    async fn reduce_of_nothing_yields_initial_on_a_later_turn() {
        let folding = reduce(Vec::<u32>::new(), 7u32, |acc, n| async move { Ok::<_, ()>(acc + n) });
        tokio::pin!(folding);

        assert!(futures::poll!(folding.as_mut()).is_pending());
        assert_eq!(folding.await, Ok(7));
    }

    #[tokio::test]
    async fn times_collects_by_index() {
        let out = times(4, Limit::new(2).unwrap(), |i| async move { Ok::<_, ()>(i * i) }).await;
        assert_eq!(out, Ok(vec![0, 1, 4, 9]));
    }
}
