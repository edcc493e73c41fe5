//! Fan-out sink combinator.

use log::debug;

use crate::sink::Sink;

/// Object-safe view of a member sink, so sinks of differing concrete types
/// can share one fan-out.
trait Member<T>: Send {
    fn accept_value(&mut self, value: T);
    fn close_member(&mut self);
}

struct Slot<S: Sink> {
    sink: Option<S>,
}

impl<S> Member<S::Item> for Slot<S>
where
    S: Sink + Send,
    S::Item: Send,
{
    fn accept_value(&mut self, value: S::Item) {
        if let Some(sink) = self.sink.as_mut() {
            sink.accept(value);
        }
    }

    fn close_member(&mut self) {
        if let Some(sink) = self.sink.take() {
            let _ = sink.close();
        }
    }
}

/// A sink built from N member sinks.
///
/// `accept` forwards each value to every member in member-order; `close`
/// closes every member exactly once. The combinator's own close result is
/// `()`: the result is inherently many-valued, so callers inspect members
/// individually, typically through the [`SharedSink`](crate::SharedSink)
/// handles they kept when adding them.
pub struct Multicast<T> {
    members: Vec<Box<dyn Member<T>>>,
}

impl<T> Multicast<T> {
    pub fn new() -> Self {
        Multicast {
            members: Vec::new(),
        }
    }

    /// Add a member sink, keeping member-order.
    pub fn add<S>(mut self, sink: S) -> Self
    where
        S: Sink<Item = T> + Send + 'static,
        T: Send,
    {
        self.members.push(Box::new(Slot { sink: Some(sink) }));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T> Default for Multicast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Sink for Multicast<T> {
    type Item = T;
    type Closed = ();

    fn accept(&mut self, value: T) -> &mut Self {
        for member in &mut self.members {
            member.accept_value(value.clone());
        }
        self
    }

    fn close(mut self) {
        debug!("closing multicast of {} members", self.members.len());
        for member in &mut self.members {
            member.close_member();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedSink;

    #[test]
    fn test_fan_out_preserves_order_and_completeness() {
        let left = SharedSink::new(Vec::new());
        let text = SharedSink::new(String::new());
        let right = SharedSink::new(Vec::new());

        let mut fan = Multicast::new()
            .add(left.clone())
            .add(text.clone())
            .add(right.clone());
        assert_eq!(fan.len(), 3);

        for letter in ["a", "b", "c", "d", "e"] {
            fan.accept(letter.to_string());
        }
        fan.close();

        let expected: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(left.take_result(), Some(expected.clone()));
        assert_eq!(right.take_result(), Some(expected));
        assert_eq!(text.take_result(), Some("abcde".to_string()));
        assert_eq!(left.close_count(), 1);
        assert_eq!(text.close_count(), 1);
        assert_eq!(right.close_count(), 1);
    }

    #[test]
    fn test_empty_multicast_closes() {
        let fan: Multicast<i32> = Multicast::new();
        assert!(fan.is_empty());
        fan.close();
    }
}
