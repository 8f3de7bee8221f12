/// Unwraps a `Result` inside a function returning `Option<Result<T, E>>`.
///
/// `Ok(t)` evaluates to `t`; `Err(e)` makes the enclosing function return
/// `Some(Err(e))`. Intended for `Iterator::next` implementations that yield
/// fallible items, such as row iterators built over batch readers.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(Err(err));
            }
        }
    };
}
