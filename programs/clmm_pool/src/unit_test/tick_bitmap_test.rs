use crate::tick_bitmap::TickBitmap;
use anchor_lang::prelude::*;

/// Tests for the compressed tick bitmap
mod tick_bitmap_tests {
    use super::*;

    const SPACING: u16 = 60;

    fn bitmap_with(ticks: &[i32]) -> TickBitmap {
        let mut bitmap = TickBitmap::default();
        for &tick in ticks {
            bitmap.flip(tick, SPACING).expect("aligned tick");
        }
        bitmap
    }

    /// Tests for flipping bits on and off
    mod flip_tests {
        use super::*;

        #[test]
        fn test_flip_round_trip() -> Result<()> {
            let mut bitmap = TickBitmap::default();
            assert!(!bitmap.is_initialized(-600, SPACING));

            bitmap.flip(-600, SPACING)?;
            assert!(bitmap.is_initialized(-600, SPACING));

            bitmap.flip(-600, SPACING)?;
            assert!(!bitmap.is_initialized(-600, SPACING));
            Ok(())
        }

        #[test]
        fn test_flip_is_per_tick() -> Result<()> {
            let mut bitmap = TickBitmap::default();
            bitmap.flip(0, SPACING)?;
            bitmap.flip(600, SPACING)?;

            assert!(bitmap.is_initialized(0, SPACING));
            assert!(bitmap.is_initialized(600, SPACING));
            assert!(!bitmap.is_initialized(60, SPACING));
            assert!(!bitmap.is_initialized(-600, SPACING));
            Ok(())
        }

        #[test]
        fn test_misaligned_tick_rejected() {
            let mut bitmap = TickBitmap::default();
            let result = bitmap.flip(61, SPACING);
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("InvalidTick"));
            // Negative misalignment too
            assert!(bitmap.flip(-61, SPACING).is_err());
        }
    }

    /// Tests for the word-bounded next-initialized-tick search
    mod next_initialized_tick_tests {
        use super::*;

        #[test]
        fn test_lte_finds_the_start_tick_itself() {
            let bitmap = bitmap_with(&[0]);
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(0, SPACING, true),
                (0, true)
            );
        }

        #[test]
        fn test_lte_from_unaligned_tick_floors_down() {
            let bitmap = bitmap_with(&[0]);
            // 59 compresses to bucket 0, which is initialized
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(59, SPACING, true),
                (0, true)
            );
            // -1 compresses to bucket -1, so bucket 0 is no longer at or
            // below the start
            let (tick, initialized) =
                bitmap.next_initialized_tick_within_one_word(-1, SPACING, true);
            assert!(!initialized);
            assert!(tick < 0);
        }

        #[test]
        fn test_lte_searches_down_within_word() {
            let bitmap = bitmap_with(&[-600]);
            // From -1 the search crosses into word -1 and lands on -600
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-1, SPACING, true),
                (-600, true)
            );
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-600, SPACING, true),
                (-600, true)
            );
        }

        #[test]
        fn test_lte_prefers_nearest_of_several() {
            let bitmap = bitmap_with(&[-600, -60]);
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-1, SPACING, true),
                (-60, true)
            );
            // From below -60, only -600 remains
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-61, SPACING, true),
                (-600, true)
            );
        }

        #[test]
        fn test_lte_empty_word_returns_boundary() {
            let bitmap = bitmap_with(&[-600]);
            // -660 compresses to bucket -11 (bit 53); -600 sits at bit 54,
            // above the mask, so the word scan comes up empty
            let (tick, initialized) =
                bitmap.next_initialized_tick_within_one_word(-660, SPACING, true);
            assert_eq!((tick, initialized), (-3840, false));
        }

        #[test]
        fn test_gt_is_strictly_above() {
            let bitmap = bitmap_with(&[0, 600]);
            // The search never returns the start tick itself
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(0, SPACING, false),
                (600, true)
            );
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-60, SPACING, false),
                (0, true)
            );
        }

        #[test]
        fn test_gt_from_negative_unaligned_tick() {
            let bitmap = bitmap_with(&[-60]);
            // -61 compresses to bucket -2, so -60 is strictly above
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(-61, SPACING, false),
                (-60, true)
            );
        }

        #[test]
        fn test_gt_empty_word_returns_boundary() {
            let bitmap = TickBitmap::default();
            // Word 0 covers buckets 0..=63; from bucket 0 the scan tops out
            // at bucket 63
            assert_eq!(
                bitmap.next_initialized_tick_within_one_word(0, SPACING, false),
                (3780, false)
            );
        }

        #[test]
        fn test_search_does_not_leave_the_word() {
            // 4200 compresses to bucket 70 in word 1; a search from word 0
            // must stop at the word boundary instead of finding it
            let bitmap = bitmap_with(&[4200]);
            let (tick, initialized) =
                bitmap.next_initialized_tick_within_one_word(0, SPACING, false);
            assert_eq!((tick, initialized), (3780, false));

            // Searching again from the boundary finds it in word 1
            let (tick, initialized) =
                bitmap.next_initialized_tick_within_one_word(3780, SPACING, false);
            assert_eq!((tick, initialized), (4200, true));
        }
    }
}
