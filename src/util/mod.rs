pub mod tokio;

/// Clone the listed values and move the clones into an `async` block.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use sunline::async_cloned;
///
/// let shared = Arc::new(5);
/// let future = async_cloned!(shared; { *shared + 1 });
/// drop(future);
/// assert_eq!(Arc::strong_count(&shared), 1);
/// ```
#[macro_export]
macro_rules! async_cloned {
    ($($n:ident),+; $body:block) => (
        {
            $( let $n = $n.clone(); )+
            async move { $body }
        }
    );
}
