//! Planner logging.
//!
//! This allows for detailed logging of the region maps while a plan is being computed.

/// Log to the appropriate source.
///
/// The first argument this takes is of the form `map;cursor`, which is used to print the region
/// map's state. `cursor` is what the operation "revolves around" to give a sense of position.
///
/// If the `;cursor` part is left out, no cursor will be printed.
///
/// The rest of the arguments are just normal formatters.
macro_rules! log {
    ($map:expr, $( $arg:expr ),*) => {
        log!($map;(), $( $arg ),*);
    };
    ($map:expr;$cur:expr, $( $arg:expr ),*) => {
        #[cfg(feature = "log")]
        {
            use core::fmt::Write;

            use $crate::log::internal::IntoCursor;

            // Print the map state.
            let mut log = $crate::write::LogWriter::new();
            let _ = write!(log, "{:16?} : ", $crate::log::internal::RegionLogger {
                cur: $cur.clone().into_cursor(),
                regions: $map.entries(),
            });

            // Print the log message.
            let _ = write!(log, $( $arg ),*);
            let _ = writeln!(log, " (at {}:{})", file!(), line!());
        }
    };
}

/// Top secret place-holding module.
#[cfg(feature = "log")]
pub mod internal {
    use region::Region;

    use core::fmt;

    use core::cell::Cell;

    /// A "cursor".
    ///
    /// Cursors represents a region or an interval of regions in the log output. This trait is
    /// implemented for various types that can represent a cursor.
    pub trait Cursor {
        /// Iteration at n.
        ///
        /// This is called in the logging loop. The cursor should then write, what it needs, to the
        /// formatter if the underlying condition is true.
        ///
        /// For example, a plain position cursor will write `"|"` when `n == self.pos`.
        fn at(&self, f: &mut fmt::Formatter, n: usize) -> fmt::Result;

        /// The after hook.
        ///
        /// This is run when the loop is over. The aim is to e.g. catch up if the cursor wasn't
        /// printed (i.e. is out of range).
        fn after(&self, f: &mut fmt::Formatter) -> fmt::Result;
    }

    /// Types that can be converted into a cursor.
    pub trait IntoCursor {
        /// The end result.
        type Cursor: Cursor;

        /// Convert this value into its equivalent cursor.
        fn into_cursor(self) -> Self::Cursor;
    }

    /// A single-point cursor.
    pub struct UniCursor {
        /// The position where this cursor will be placed.
        pos: usize,
        /// Is this cursor printed?
        ///
        /// This is used for the after hook.
        is_printed: Cell<bool>,
    }

    impl Cursor for UniCursor {
        fn at(&self, f: &mut fmt::Formatter, n: usize) -> fmt::Result {
            if self.pos == n {
                self.is_printed.set(true);
                write!(f, "|")?;
            }

            Ok(())
        }

        fn after(&self, f: &mut fmt::Formatter) -> fmt::Result {
            if !self.is_printed.get() {
                write!(f, "…|")?;
            }

            Ok(())
        }
    }

    impl IntoCursor for usize {
        type Cursor = UniCursor;

        fn into_cursor(self) -> UniCursor {
            UniCursor {
                pos: self,
                is_printed: Cell::new(false),
            }
        }
    }

    impl Cursor for () {
        fn at(&self, _: &mut fmt::Formatter, _: usize) -> fmt::Result { Ok(()) }

        fn after(&self, _: &mut fmt::Formatter) -> fmt::Result { Ok(()) }
    }

    impl IntoCursor for () {
        type Cursor = ();

        fn into_cursor(self) -> () {
            ()
        }
    }

    /// A "region logger".
    ///
    /// This intend to show the structure of a region map. The syntax used is like:
    ///
    /// ```notrust
    /// UF|RAT$
    /// ```
    ///
    /// where each region is printed as the glyph of its type (see `RegionType::glyph`), with `|`
    /// representing the cursor.
    pub struct RegionLogger<'a, T> {
        /// The cursor.
        ///
        /// This is where the `|` will be printed.
        pub cur: T,
        /// The regions.
        pub regions: &'a [Region],
    }

    impl<'a, T: Cursor> fmt::Debug for RegionLogger<'a, T> {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            for (n, i) in self.regions.iter().enumerate() {
                self.cur.at(f, n)?;

                write!(f, "{}", i.kind.glyph())?;
            }

            self.cur.after(f)?;

            Ok(())
        }
    }
}
