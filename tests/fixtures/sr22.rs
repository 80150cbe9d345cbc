/// A small but complete distribution: two groups, two foods, two nutrients,
/// with every supporting table filled in. Members are in archive order.
pub const SAMPLE_MEMBERS: [(&str, &str); 10] = [
    ("FOOD_DES.txt", include_str!("sr22/FOOD_DES.txt")),
    ("FD_GROUP.txt", include_str!("sr22/FD_GROUP.txt")),
    ("NUT_DATA.txt", include_str!("sr22/NUT_DATA.txt")),
    ("NUTR_DEF.txt", include_str!("sr22/NUTR_DEF.txt")),
    ("SRC_CD.txt", include_str!("sr22/SRC_CD.txt")),
    ("DERIV_CD.txt", include_str!("sr22/DERIV_CD.txt")),
    ("WEIGHT.txt", include_str!("sr22/WEIGHT.txt")),
    ("FOOTNOTE.txt", include_str!("sr22/FOOTNOTE.txt")),
    ("DATSRCLN.txt", include_str!("sr22/DATSRCLN.txt")),
    ("DATA_SRC.txt", include_str!("sr22/DATA_SRC.txt")),
];
