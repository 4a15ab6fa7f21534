use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Region area used for branches that are missing from the table.
pub const OTHER_AREA: &str = "7";
pub const UNKNOWN: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub code: &'static str,
    pub name: &'static str,
    pub area_code: &'static str,
    /// Service tier, empty when the branch has not been tiered.
    pub tier: &'static str,
}

const fn branch(
    code: &'static str,
    name: &'static str,
    area_code: &'static str,
    tier: &'static str,
) -> Branch {
    Branch {
        code,
        name,
        area_code,
        tier,
    }
}

const BRANCHES: &[Branch] = &[
    branch("03", "儲蓄部", "1", "1"),
    branch("06", "城中", "1", "1"),
    branch("22", "內湖", "1", "1"),
    branch("23", "中山", "1", "2"),
    branch("28", "松山", "1", "2"),
    branch("36", "士林", "1", "2"),
    branch("44", "承德", "1", "1"),
    branch("47", "三民", "1", "1"),
    branch("51", "天母", "1", "2"),
    branch("57", "西湖", "1", "1"),
    branch("62", "南港", "1", "3"),
    branch("65", "宜蘭", "1", "3"),
    branch("68", "敦北", "1", "3"),
    branch("81", "永吉", "1", ""),
    branch("09", "東台北", "2", "1"),
    branch("18", "信義", "2", "2"),
    branch("19", "民生", "2", "1"),
    branch("20", "忠孝", "2", "1"),
    branch("21", "龍山", "2", "1"),
    branch("24", "仁愛", "2", "1"),
    branch("31", "松南", "2", "1"),
    branch("40", "南京東路", "2", "2"),
    branch("43", "世貿", "2", "1"),
    branch("45", "汐止", "2", "1"),
    branch("53", "基隆", "2", "2"),
    branch("55", "內科", "2", "2"),
    branch("66", "文山", "2", "3"),
    branch("71", "松江", "2", "3"),
    branch("13", "三重", "3", "1"),
    branch("14", "板橋", "3", "2"),
    branch("15", "永和", "3", "1"),
    branch("25", "新莊", "3", "1"),
    branch("29", "新店", "3", "2"),
    branch("32", "蘆洲", "3", "1"),
    branch("33", "中和", "3", "1"),
    branch("39", "北三重", "3", "2"),
    branch("42", "土城", "3", "2"),
    branch("48", "華江", "3", "2"),
    branch("52", "樹林", "3", "2"),
    branch("56", "北中和", "3", "2"),
    branch("59", "二重", "3", "2"),
    branch("75", "丹鳳", "3", "3"),
    branch("76", "北新莊", "3", "3"),
    branch("79", "林口", "3", ""),
    branch("11", "桃園", "4", "2"),
    branch("26", "中壢", "4", "1"),
    branch("34", "新竹", "4", "2"),
    branch("54", "楊梅", "4", "1"),
    branch("60", "延平", "4", "3"),
    branch("61", "南崁", "4", "3"),
    branch("63", "北新竹", "4", "3"),
    branch("70", "竹北", "4", "3"),
    branch("73", "觀音", "4", "3"),
    branch("74", "北桃園", "4", "3"),
    branch("80", "竹科", "4", ""),
    branch("84", "苗栗", "4", ""),
    branch("08", "台中", "5", "2"),
    branch("16", "員林", "5", "3"),
    branch("35", "中港", "5", "2"),
    branch("41", "大里", "5", "3"),
    branch("49", "豐原", "5", "3"),
    branch("72", "市政", "5", "3"),
    branch("77", "南屯", "5", "3"),
    branch("04", "高雄", "6", "2"),
    branch("10", "台南", "6", "2"),
    branch("12", "北高雄", "6", "2"),
    branch("30", "前金", "6", "2"),
    branch("37", "東台南", "6", "2"),
    branch("38", "永康", "6", "3"),
    branch("46", "屏東", "6", "3"),
    branch("50", "鳳山", "6", "3"),
    branch("69", "東高雄", "6", "3"),
    branch("83", "南科", "6", "3"),
    branch("02", "國營二部", "7", ""),
    branch("05", "國外部", "7", ""),
    branch("27", "OBU", "7", ""),
    branch("64", "香港", "7", ""),
    branch("67", "越南同奈", "7", ""),
];

const REGION_AREAS: &[(&str, &str)] = &[
    ("1", "北一區"),
    ("2", "北二區"),
    ("3", "新北區"),
    ("4", "桃竹區"),
    ("5", "中區"),
    ("6", "南區"),
    ("7", "其他"),
];

const RATING_TYPES: &[(&str, &str)] = &[
    ("1", "出席紀錄"),
    ("2", "課程互動"),
    ("3", "成功案例"),
    ("4", "課後作業/測驗"),
    ("5", "問卷回饋"),
    ("6", "其他"),
];

const CLASS_TYPES: &[(&str, &str)] = &[("1", "線上"), ("2", "影片"), ("3", "實體")];

static BRANCH_INDEX: Lazy<HashMap<&'static str, &'static Branch>> =
    Lazy::new(|| BRANCHES.iter().map(|b| (b.code, b)).collect());

static REGION_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| REGION_AREAS.iter().copied().collect());

pub fn branch_by_code(code: &str) -> Option<&'static Branch> {
    BRANCH_INDEX.get(code).copied()
}

/// Display name of the branch, `N/A` for unknown codes.
pub fn branch_name(code: &str) -> &'static str {
    branch_by_code(code).map_or(UNKNOWN, |b| b.name)
}

pub fn region_name(area_code: &str) -> Option<&'static str> {
    REGION_INDEX.get(area_code).copied()
}

/// Region display name for a branch code. Unknown branches fall into the
/// "other" area; an area without a display name resolves to `N/A`.
pub fn region_for_branch(code: &str) -> &'static str {
    let area = branch_by_code(code).map_or(OTHER_AREA, |b| b.area_code);
    region_name(area).unwrap_or(UNKNOWN)
}

pub fn rating_type_name(code: &str) -> Option<&'static str> {
    lookup(RATING_TYPES, code)
}

pub fn class_type_name(code: &str) -> Option<&'static str> {
    lookup(CLASS_TYPES, code)
}

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, name)| *name)
}

/// All branches ordered by code.
pub fn branches() -> Vec<&'static Branch> {
    let mut list: Vec<&'static Branch> = BRANCHES.iter().collect();
    list.sort_by(|a, b| a.code.cmp(b.code));
    list
}

/// All region areas ordered by area code.
pub fn region_areas() -> Vec<(&'static str, &'static str)> {
    let mut list = REGION_AREAS.to_vec();
    list.sort_by(|a, b| a.0.cmp(b.0));
    list
}

pub fn rating_types() -> Vec<(&'static str, &'static str)> {
    let mut list = RATING_TYPES.to_vec();
    list.sort_by(|a, b| a.0.cmp(b.0));
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_branch_resolves_to_its_region() {
        assert_eq!(branch_name("03"), "儲蓄部");
        assert_eq!(region_for_branch("03"), "北一區");
        assert_eq!(region_for_branch("83"), "南區");
    }

    #[test]
    fn unknown_branch_falls_back_to_other_area() {
        assert_eq!(branch_name("99"), UNKNOWN);
        assert_eq!(region_for_branch("99"), "其他");
        assert_eq!(region_for_branch(""), "其他");
    }

    #[test]
    fn branch_codes_are_unique() {
        assert_eq!(BRANCH_INDEX.len(), BRANCHES.len());
    }

    #[test]
    fn every_branch_area_has_a_name() {
        for b in BRANCHES {
            assert!(region_name(b.area_code).is_some(), "branch {}", b.code);
        }
    }

    #[test]
    fn listings_are_sorted_by_code() {
        let codes: Vec<&str> = branches().iter().map(|b| b.code).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
        assert_eq!(region_areas().first(), Some(&("1", "北一區")));
    }

    #[test]
    fn type_tables_lookup() {
        assert_eq!(rating_type_name("5"), Some("問卷回饋"));
        assert_eq!(rating_type_name("9"), None);
        assert_eq!(class_type_name("3"), Some("實體"));
    }
}
