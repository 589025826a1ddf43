// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative task graphs whose dependencies arrive as named arguments.
//!
//! The graph opens with its `<Value, Error>` types, followed by entries
//! written `name(dep1, dep2) => future`. The dependency names are bound as
//! local variables holding clones of the dependencies' results, so the future
//! can use them directly and may name the same dependency more than once.
//! Write the future as `async move` so it owns those bindings.
//!
//! ```rust
//! use the_cadence::auto_inject;
//! use the_cadence::config::Limit;
//! use the_cadence::engine::auto::auto;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let graph = auto_inject! {
//!     <u32, String>
//!     width() => async { Ok(4) },
//!     height() => async { Ok(5) },
//!     area(width, height) => async move { Ok(width * height) },
//! };
//!
//! let results = auto(graph, Limit::UNBOUNDED).await.unwrap();
//! assert_eq!(results.get("area"), Some(&20));
//! # }
//! ```

/// Build a [`TaskGraph`](crate::engine::auto::TaskGraph) from
/// `name(dependencies) => future` entries.
#[macro_export]
macro_rules! auto_inject {
    (@typed < $v:ty, $e:ty > $( $name:ident ( $( $dep:ident ),* $(,)? ) => $body:expr ),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut graph: $crate::engine::auto::TaskGraph<$v, $e> = $crate::engine::auto::TaskGraph::new();
        $(
            {
                #[allow(unused_variables)]
                let unit = move |results: $crate::engine::auto::Results<$v>| {
                    $(
                        let $dep = match results.get(stringify!($dep)) {
                            Some(value) => ::std::clone::Clone::clone(value),
                            None => unreachable!("dependency '{}' was not supplied", stringify!($dep)),
                        };
                    )*
                    $body
                };
                graph.insert(
                    stringify!($name),
                    $crate::engine::auto::Task::from_parts(
                        vec![$( stringify!($dep).to_string() ),*],
                        unit,
                    ),
                );
            }
        )*
        graph
    }};
    (< $v:ty, $e:ty > $( $rest:tt )*) => {
        $crate::auto_inject!(@typed < $v, $e > $( $rest )*)
    };
}
