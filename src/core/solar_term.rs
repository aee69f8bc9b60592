use crate::domain::model::Branch;

/// Ecliptic longitude where the tiger month (立春, start of spring) begins.
pub const TIGER_MONTH_START_DEG: f64 = 315.0;

/// Month branch for each 30° sector counted from 315°.
const SECTOR_BRANCHES: [u8; 12] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0, 1];

/// 30° sector `0..12` of a solar longitude, sector 0 starting at 315°.
pub fn sector_from_longitude(lon_deg: f64) -> usize {
    let shifted = (lon_deg - TIGER_MONTH_START_DEG + 360.0).rem_euclid(360.0);
    ((shifted / 30.0).floor() as usize).min(11)
}

/// Month branch of the solar-term month containing `lon_deg`.
pub fn branch_from_longitude(lon_deg: f64) -> Branch {
    Branch::wrapping(SECTOR_BRANCHES[sector_from_longitude(lon_deg)] as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiger_month_window() {
        assert_eq!(branch_from_longitude(315.0), Branch::TIGER);
        assert_eq!(branch_from_longitude(315.5), Branch::TIGER);
        assert_eq!(branch_from_longitude(344.999), Branch::TIGER);
        assert_eq!(branch_from_longitude(345.0), Branch::RABBIT);
    }

    #[test]
    fn test_zero_degrees_is_rabbit_month() {
        assert_eq!(sector_from_longitude(0.0), 1);
        assert_eq!(branch_from_longitude(0.0), Branch::RABBIT);
    }

    #[test]
    fn test_every_thirty_degree_boundary() {
        // (boundary longitude, branch starting there)
        let expected = [
            (315.0, 2),
            (345.0, 3),
            (15.0, 4),
            (45.0, 5),
            (75.0, 6),
            (105.0, 7),
            (135.0, 8),
            (165.0, 9),
            (195.0, 10),
            (225.0, 11),
            (255.0, 0),
            (285.0, 1),
        ];
        for (lon, branch) in expected {
            assert_eq!(branch_from_longitude(lon).index(), branch, "at {}°", lon);
            let before = branch_from_longitude(lon - 0.001).index();
            assert_eq!(before, (branch + 11) % 12, "just before {}°", lon);
        }
    }

    #[test]
    fn test_out_of_range_longitudes_are_reduced() {
        assert_eq!(branch_from_longitude(360.0), branch_from_longitude(0.0));
        assert_eq!(branch_from_longitude(-45.0), Branch::TIGER);
        assert_eq!(branch_from_longitude(675.5), Branch::TIGER);
        for tenth in 0..3600 {
            assert!(branch_from_longitude(tenth as f64 / 10.0).index() < 12);
        }
    }
}
