//! Static numbering data: calling codes, country names, NANP area codes and
//! per-code numbering plans.

/// Calling code (digits, no `+`), ISO 3166 alpha-2 region, display name.
///
/// `+1` is absent on purpose: it is split between Canada and the United States
/// by area code.
pub(crate) const CALLING_CODES: &[(&str, &str, &str)] = &[
    ("7", "RU", "Russia"),
    ("20", "EG", "Egypt"),
    ("27", "ZA", "South Africa"),
    ("30", "GR", "Greece"),
    ("31", "NL", "Netherlands"),
    ("32", "BE", "Belgium"),
    ("33", "FR", "France"),
    ("34", "ES", "Spain"),
    ("36", "HU", "Hungary"),
    ("39", "IT", "Italy"),
    ("40", "RO", "Romania"),
    ("41", "CH", "Switzerland"),
    ("43", "AT", "Austria"),
    ("44", "GB", "United Kingdom"),
    ("45", "DK", "Denmark"),
    ("46", "SE", "Sweden"),
    ("47", "NO", "Norway"),
    ("48", "PL", "Poland"),
    ("49", "DE", "Germany"),
    ("51", "PE", "Peru"),
    ("52", "MX", "Mexico"),
    ("54", "AR", "Argentina"),
    ("55", "BR", "Brazil"),
    ("56", "CL", "Chile"),
    ("57", "CO", "Colombia"),
    ("58", "VE", "Venezuela"),
    ("60", "MY", "Malaysia"),
    ("61", "AU", "Australia"),
    ("62", "ID", "Indonesia"),
    ("63", "PH", "Philippines"),
    ("64", "NZ", "New Zealand"),
    ("65", "SG", "Singapore"),
    ("66", "TH", "Thailand"),
    ("81", "JP", "Japan"),
    ("82", "KR", "South Korea"),
    ("84", "VN", "Vietnam"),
    ("86", "CN", "China"),
    ("90", "TR", "Turkey"),
    ("91", "IN", "India"),
    ("92", "PK", "Pakistan"),
    ("93", "AF", "Afghanistan"),
    ("94", "LK", "Sri Lanka"),
    ("95", "MM", "Myanmar"),
    ("98", "IR", "Iran"),
    ("211", "SS", "South Sudan"),
    ("212", "MA", "Morocco"),
    ("213", "DZ", "Algeria"),
    ("216", "TN", "Tunisia"),
    ("218", "LY", "Libya"),
    ("220", "GM", "Gambia"),
    ("221", "SN", "Senegal"),
    ("222", "MR", "Mauritania"),
    ("223", "ML", "Mali"),
    ("224", "GN", "Guinea"),
    ("225", "CI", "Ivory Coast"),
    ("226", "BF", "Burkina Faso"),
    ("227", "NE", "Niger"),
    ("228", "TG", "Togo"),
    ("229", "BJ", "Benin"),
    ("230", "MU", "Mauritius"),
    ("231", "LR", "Liberia"),
    ("232", "SL", "Sierra Leone"),
    ("233", "GH", "Ghana"),
    ("234", "NG", "Nigeria"),
    ("235", "TD", "Chad"),
    ("236", "CF", "Central African Republic"),
    ("237", "CM", "Cameroon"),
    ("238", "CV", "Cape Verde"),
    ("239", "ST", "São Tomé and Príncipe"),
    ("240", "GQ", "Equatorial Guinea"),
    ("241", "GA", "Gabon"),
    ("242", "CG", "Republic of the Congo"),
    ("243", "CD", "Democratic Republic of the Congo"),
    ("244", "AO", "Angola"),
    ("245", "GW", "Guinea-Bissau"),
    ("246", "IO", "British Indian Ocean Territory"),
    ("247", "AC", "Ascension Island"),
    ("248", "SC", "Seychelles"),
    ("249", "SD", "Sudan"),
    ("250", "RW", "Rwanda"),
    ("251", "ET", "Ethiopia"),
    ("252", "SO", "Somalia"),
    ("253", "DJ", "Djibouti"),
    ("254", "KE", "Kenya"),
    ("255", "TZ", "Tanzania"),
    ("256", "UG", "Uganda"),
    ("257", "BI", "Burundi"),
    ("258", "MZ", "Mozambique"),
    ("260", "ZM", "Zambia"),
    ("261", "MG", "Madagascar"),
    ("262", "YT", "Mayotte"),
    ("263", "ZW", "Zimbabwe"),
    ("264", "NA", "Namibia"),
    ("265", "MW", "Malawi"),
    ("266", "LS", "Lesotho"),
    ("267", "BW", "Botswana"),
    ("268", "SZ", "Eswatini"),
    ("269", "KM", "Comoros"),
    ("290", "SH", "Saint Helena"),
    ("291", "ER", "Eritrea"),
    ("297", "AW", "Aruba"),
    ("298", "FO", "Faroe Islands"),
    ("299", "GL", "Greenland"),
    ("350", "GI", "Gibraltar"),
    ("351", "PT", "Portugal"),
    ("352", "LU", "Luxembourg"),
    ("353", "IE", "Ireland"),
    ("354", "IS", "Iceland"),
    ("355", "AL", "Albania"),
    ("356", "MT", "Malta"),
    ("357", "CY", "Cyprus"),
    ("358", "FI", "Finland"),
    ("359", "BG", "Bulgaria"),
    ("370", "LT", "Lithuania"),
    ("371", "LV", "Latvia"),
    ("372", "EE", "Estonia"),
    ("373", "MD", "Moldova"),
    ("374", "AM", "Armenia"),
    ("375", "BY", "Belarus"),
    ("376", "AD", "Andorra"),
    ("377", "MC", "Monaco"),
    ("378", "SM", "San Marino"),
    ("379", "VA", "Vatican City"),
    ("380", "UA", "Ukraine"),
    ("381", "RS", "Serbia"),
    ("382", "ME", "Montenegro"),
    ("383", "XK", "Kosovo"),
    ("385", "HR", "Croatia"),
    ("386", "SI", "Slovenia"),
    ("387", "BA", "Bosnia and Herzegovina"),
    ("389", "MK", "North Macedonia"),
    ("420", "CZ", "Czech Republic"),
    ("421", "SK", "Slovakia"),
    ("423", "LI", "Liechtenstein"),
    ("500", "FK", "Falkland Islands"),
    ("501", "BZ", "Belize"),
    ("502", "GT", "Guatemala"),
    ("503", "SV", "El Salvador"),
    ("504", "HN", "Honduras"),
    ("505", "NI", "Nicaragua"),
    ("506", "CR", "Costa Rica"),
    ("507", "PA", "Panama"),
    ("508", "PM", "Saint Pierre and Miquelon"),
    ("509", "HT", "Haiti"),
    ("590", "GP", "Guadeloupe"),
    ("591", "BO", "Bolivia"),
    ("592", "GY", "Guyana"),
    ("593", "EC", "Ecuador"),
    ("594", "GF", "French Guiana"),
    ("595", "PY", "Paraguay"),
    ("596", "MQ", "Martinique"),
    ("597", "SR", "Suriname"),
    ("598", "UY", "Uruguay"),
    ("599", "CW", "Curaçao"),
    ("670", "TL", "East Timor"),
    ("672", "NF", "Norfolk Island"),
    ("673", "BN", "Brunei"),
    ("674", "NR", "Nauru"),
    ("675", "PG", "Papua New Guinea"),
    ("676", "TO", "Tonga"),
    ("677", "SB", "Solomon Islands"),
    ("678", "VU", "Vanuatu"),
    ("679", "FJ", "Fiji"),
    ("680", "PW", "Palau"),
    ("681", "WF", "Wallis and Futuna"),
    ("682", "CK", "Cook Islands"),
    ("683", "NU", "Niue"),
    ("684", "AS", "American Samoa"),
    ("685", "WS", "Samoa"),
    ("686", "KI", "Kiribati"),
    ("687", "NC", "New Caledonia"),
    ("688", "TV", "Tuvalu"),
    ("689", "PF", "French Polynesia"),
    ("690", "TK", "Tokelau"),
    ("691", "FM", "Micronesia"),
    ("692", "MH", "Marshall Islands"),
    ("850", "KP", "North Korea"),
    ("852", "HK", "Hong Kong"),
    ("853", "MO", "Macau"),
    ("855", "KH", "Cambodia"),
    ("856", "LA", "Laos"),
    ("880", "BD", "Bangladesh"),
    ("886", "TW", "Taiwan"),
    ("960", "MV", "Maldives"),
    ("961", "LB", "Lebanon"),
    ("962", "JO", "Jordan"),
    ("963", "SY", "Syria"),
    ("964", "IQ", "Iraq"),
    ("965", "KW", "Kuwait"),
    ("966", "SA", "Saudi Arabia"),
    ("967", "YE", "Yemen"),
    ("968", "OM", "Oman"),
    ("970", "PS", "Palestine"),
    ("971", "AE", "United Arab Emirates"),
    ("972", "IL", "Israel"),
    ("973", "BH", "Bahrain"),
    ("974", "QA", "Qatar"),
    ("975", "BT", "Bhutan"),
    ("976", "MN", "Mongolia"),
    ("977", "NP", "Nepal"),
    ("992", "TJ", "Tajikistan"),
    ("993", "TM", "Turkmenistan"),
    ("994", "AZ", "Azerbaijan"),
    ("995", "GE", "Georgia"),
    ("996", "KG", "Kyrgyzstan"),
    ("998", "UZ", "Uzbekistan"),
];

/// Assigned calling codes that have no entry in [`CALLING_CODES`]: either a
/// country we carry no name for, or a non-geographic service range.
pub(crate) const UNNAMED_CALLING_CODES: &[&str] = &[
    "53", "800", "808", "870", "878", "881", "882", "883", "888", "979",
];

/// Area codes under `+1` that belong to Canada.
pub(crate) const CANADIAN_AREA_CODES: &[&str] = &[
    "204", "226", "236", "249", "250", "257", "289", "306", "343", "365", "368", "403", "416",
    "418", "428", "431", "437", "438", "450", "468", "474", "506", "514", "519", "548", "579",
    "581", "587", "604", "613", "639", "647", "672", "683", "705", "709", "742", "778", "780",
    "782", "807", "819", "825", "867", "873", "902", "905",
];

/// Toll-free area codes under `+1`.
pub(crate) const NANP_TOLL_FREE: &[&str] = &["800", "833", "844", "855", "866", "877", "888"];

/// Numbering plan for one calling code: accepted national significant number
/// lengths and the leading digits of mobile ranges.
pub(crate) struct NumberingPlan {
    pub calling_code: &'static str,
    pub lengths: &'static [usize],
    pub mobile_prefixes: &'static [&'static str],
    /// Plans that do not distinguish fixed and mobile ranges.
    pub fixed_or_mobile: bool,
}

pub(crate) const NUMBERING_PLANS: &[NumberingPlan] = &[
    NumberingPlan {
        calling_code: "7",
        lengths: &[10],
        mobile_prefixes: &["9"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "33",
        lengths: &[9],
        mobile_prefixes: &["6", "7"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "34",
        lengths: &[9],
        mobile_prefixes: &["6", "7"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "39",
        lengths: &[6, 7, 8, 9, 10, 11],
        mobile_prefixes: &["3"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "44",
        lengths: &[9, 10],
        mobile_prefixes: &["7"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "49",
        lengths: &[6, 7, 8, 9, 10, 11, 12, 13],
        mobile_prefixes: &["15", "16", "17"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "52",
        lengths: &[10],
        mobile_prefixes: &[],
        fixed_or_mobile: true,
    },
    NumberingPlan {
        calling_code: "61",
        lengths: &[9],
        mobile_prefixes: &["4"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "62",
        lengths: &[8, 9, 10, 11, 12],
        mobile_prefixes: &["8"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "81",
        lengths: &[9, 10],
        mobile_prefixes: &["70", "80", "90"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "82",
        lengths: &[8, 9, 10],
        mobile_prefixes: &["10"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "86",
        lengths: &[9, 10, 11],
        mobile_prefixes: &["13", "14", "15", "16", "17", "18", "19"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "90",
        lengths: &[10],
        mobile_prefixes: &["5"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "91",
        lengths: &[10],
        mobile_prefixes: &["6", "7", "8", "9"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "92",
        lengths: &[9, 10],
        mobile_prefixes: &["3"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "98",
        lengths: &[10],
        mobile_prefixes: &["9"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "234",
        lengths: &[8, 10],
        mobile_prefixes: &["70", "80", "81", "90", "91"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "380",
        lengths: &[9],
        mobile_prefixes: &[
            "39", "50", "63", "66", "67", "68", "73", "91", "92", "93", "94", "95", "96", "97",
            "98", "99",
        ],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "966",
        lengths: &[9],
        mobile_prefixes: &["5"],
        fixed_or_mobile: false,
    },
    NumberingPlan {
        calling_code: "971",
        lengths: &[8, 9],
        mobile_prefixes: &["5"],
        fixed_or_mobile: false,
    },
];

pub(crate) fn lookup_country(calling_code: &str) -> Option<(&'static str, &'static str)> {
    CALLING_CODES
        .iter()
        .find(|(code, _, _)| *code == calling_code)
        .map(|(_, iso, name)| (*iso, *name))
}

pub(crate) fn is_recognized(calling_code: &str) -> bool {
    calling_code == "1"
        || lookup_country(calling_code).is_some()
        || UNNAMED_CALLING_CODES.contains(&calling_code)
}

pub(crate) fn plan_for(calling_code: &str) -> Option<&'static NumberingPlan> {
    NUMBERING_PLANS
        .iter()
        .find(|p| p.calling_code == calling_code)
}

/// Calling code → display name for a stored ISO code (reverse lookup for UI).
pub(crate) fn name_for_iso(iso: &str) -> Option<&'static str> {
    match iso {
        "US" => Some("United States"),
        "CA" => Some("Canada"),
        _ => CALLING_CODES
            .iter()
            .find(|(_, i, _)| *i == iso)
            .map(|(_, _, name)| *name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_codes_are_prefix_free() {
        let mut all: Vec<&str> = CALLING_CODES.iter().map(|(c, _, _)| *c).collect();
        all.extend(UNNAMED_CALLING_CODES.iter().copied());
        all.push("1");

        for a in &all {
            for b in &all {
                if a != b {
                    assert!(!b.starts_with(a), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn every_plan_has_a_recognized_code() {
        for p in NUMBERING_PLANS {
            assert!(is_recognized(p.calling_code), "{}", p.calling_code);
            assert!(!p.lengths.is_empty());
        }
    }
}
