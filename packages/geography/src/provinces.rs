//! Built-in bounding boxes for the 81 provinces.
//!
//! Approximate extents in decimal degrees, ASCII-uppercased names matching
//! the catalog's location labels. The resolution padding absorbs the
//! approximation error, so these do not need to trace the real borders.

use crate::ProvinceBounds;

/// `(name, bounds)` pairs for every province.
pub const PROVINCE_BOUNDS: &[(&str, ProvinceBounds)] = &[
    ("ADANA", bounds(36.55, 38.25, 34.75, 36.35)),
    ("ADIYAMAN", bounds(37.40, 38.25, 37.40, 39.25)),
    ("AFYONKARAHISAR", bounds(37.75, 39.30, 29.70, 31.35)),
    ("AGRI", bounds(39.05, 40.05, 42.30, 44.10)),
    ("AKSARAY", bounds(37.90, 38.90, 33.30, 34.60)),
    ("AMASYA", bounds(40.25, 41.05, 35.00, 36.40)),
    ("ANKARA", bounds(38.70, 40.55, 30.85, 33.90)),
    ("ANTALYA", bounds(35.95, 37.55, 29.20, 32.55)),
    ("ARDAHAN", bounds(40.75, 41.60, 42.25, 43.20)),
    ("ARTVIN", bounds(40.80, 41.55, 41.10, 42.60)),
    ("AYDIN", bounds(37.35, 38.15, 27.00, 28.90)),
    ("BALIKESIR", bounds(39.10, 40.65, 26.60, 28.95)),
    ("BARTIN", bounds(41.30, 41.90, 32.00, 32.80)),
    ("BATMAN", bounds(37.50, 38.40, 40.90, 41.70)),
    ("BAYBURT", bounds(40.00, 40.60, 39.85, 40.60)),
    ("BILECIK", bounds(39.80, 40.50, 29.70, 30.60)),
    ("BINGOL", bounds(38.45, 39.55, 39.90, 41.20)),
    ("BITLIS", bounds(37.95, 38.95, 41.60, 43.00)),
    ("BOLU", bounds(40.30, 41.10, 30.75, 32.60)),
    ("BURDUR", bounds(36.85, 37.85, 29.40, 30.85)),
    ("BURSA", bounds(39.60, 40.65, 28.15, 30.05)),
    ("CANAKKALE", bounds(39.45, 40.75, 25.70, 27.60)),
    ("CANKIRI", bounds(40.20, 41.10, 32.55, 34.10)),
    ("CORUM", bounds(39.95, 41.20, 34.10, 35.45)),
    ("DENIZLI", bounds(37.20, 38.35, 28.60, 29.95)),
    ("DIYARBAKIR", bounds(37.30, 38.70, 39.30, 41.25)),
    ("DUZCE", bounds(40.65, 41.15, 30.80, 31.60)),
    ("EDIRNE", bounds(40.60, 42.00, 26.05, 27.05)),
    ("ELAZIG", bounds(38.25, 39.10, 38.50, 40.30)),
    ("ERZINCAN", bounds(39.25, 40.30, 38.30, 40.50)),
    ("ERZURUM", bounds(39.10, 40.95, 40.25, 42.40)),
    ("ESKISEHIR", bounds(39.10, 40.20, 29.95, 32.05)),
    ("GAZIANTEP", bounds(36.55, 37.50, 36.55, 38.00)),
    ("GIRESUN", bounds(40.10, 41.10, 37.90, 39.15)),
    ("GUMUSHANE", bounds(39.95, 40.75, 38.75, 40.05)),
    ("HAKKARI", bounds(37.05, 37.85, 43.05, 44.80)),
    ("HATAY", bounds(35.80, 36.90, 35.85, 36.70)),
    ("IGDIR", bounds(39.55, 40.20, 43.40, 44.85)),
    ("ISPARTA", bounds(37.25, 38.35, 30.00, 31.40)),
    ("ISTANBUL", bounds(40.80, 41.60, 27.95, 29.90)),
    ("IZMIR", bounds(37.85, 39.40, 26.20, 28.40)),
    ("KAHRAMANMARAS", bounds(37.10, 38.60, 36.15, 37.60)),
    ("KARABUK", bounds(40.85, 41.60, 32.10, 33.00)),
    ("KARAMAN", bounds(36.40, 37.60, 32.60, 34.00)),
    ("KARS", bounds(40.00, 41.20, 42.30, 43.70)),
    ("KASTAMONU", bounds(40.85, 42.05, 32.95, 34.65)),
    ("KAYSERI", bounds(37.75, 39.30, 34.90, 36.55)),
    ("KILIS", bounds(36.55, 36.95, 36.80, 37.45)),
    ("KIRIKKALE", bounds(39.35, 40.25, 33.20, 34.00)),
    ("KIRKLARELI", bounds(41.20, 42.10, 26.85, 28.10)),
    ("KIRSEHIR", bounds(38.85, 39.65, 33.55, 34.75)),
    ("KOCAELI", bounds(40.55, 41.20, 29.35, 30.40)),
    ("KONYA", bounds(36.70, 39.20, 31.25, 34.05)),
    ("KUTAHYA", bounds(38.85, 39.90, 28.95, 30.60)),
    ("MALATYA", bounds(37.85, 38.95, 37.45, 39.15)),
    ("MANISA", bounds(38.05, 39.30, 27.10, 29.10)),
    ("MARDIN", bounds(36.85, 37.80, 39.85, 41.75)),
    ("MERSIN", bounds(36.00, 37.15, 32.55, 35.10)),
    ("MUGLA", bounds(36.30, 37.55, 27.25, 29.55)),
    ("MUS", bounds(38.30, 39.30, 41.05, 42.30)),
    ("NEVSEHIR", bounds(38.15, 39.20, 34.10, 35.15)),
    ("NIGDE", bounds(37.40, 38.50, 34.15, 35.20)),
    ("ORDU", bounds(40.45, 41.15, 36.90, 38.10)),
    ("OSMANIYE", bounds(36.85, 37.50, 35.85, 36.60)),
    ("RIZE", bounds(40.60, 41.25, 40.20, 41.25)),
    ("SAKARYA", bounds(40.30, 41.20, 29.95, 30.90)),
    ("SAMSUN", bounds(40.85, 41.75, 35.05, 37.15)),
    ("SANLIURFA", bounds(36.65, 37.80, 37.80, 40.25)),
    ("SIIRT", bounds(37.45, 38.30, 41.35, 42.75)),
    ("SINOP", bounds(41.30, 42.10, 34.30, 35.45)),
    ("SIRNAK", bounds(37.05, 37.85, 41.80, 43.20)),
    ("SIVAS", bounds(38.80, 40.50, 35.80, 38.60)),
    ("TEKIRDAG", bounds(40.55, 41.35, 26.60, 28.15)),
    ("TOKAT", bounds(39.90, 40.75, 35.60, 37.45)),
    ("TRABZON", bounds(40.50, 41.20, 39.10, 40.30)),
    ("TUNCELI", bounds(38.70, 39.55, 38.95, 40.25)),
    ("USAK", bounds(38.25, 38.95, 28.75, 29.95)),
    ("VAN", bounds(37.65, 39.15, 42.30, 44.50)),
    ("YALOVA", bounds(40.45, 40.80, 28.75, 29.60)),
    ("YOZGAT", bounds(39.05, 40.30, 34.05, 36.10)),
    ("ZONGULDAK", bounds(41.00, 41.65, 31.30, 32.30)),
];

const fn bounds(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> ProvinceBounds {
    ProvinceBounds {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_81_provinces() {
        assert_eq!(PROVINCE_BOUNDS.len(), 81);
    }

    #[test]
    fn bounds_are_well_formed() {
        for (name, b) in PROVINCE_BOUNDS {
            assert!(b.lat_min < b.lat_max, "{name} has inverted latitudes");
            assert!(b.lon_min < b.lon_max, "{name} has inverted longitudes");
            assert_eq!(*name, name.to_uppercase(), "{name} is not uppercased");
        }
    }

    #[test]
    fn names_are_sorted_and_distinct() {
        for pair in PROVINCE_BOUNDS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} out of order", pair[1].0);
        }
    }
}
