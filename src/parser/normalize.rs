use chrono::NaiveDate;

use super::layout::RawRecord;
use crate::error::{Result, ScrapeError};

/// Performance fields rendered with their accuracy on a second line.
const ANNOTATED_FIELDS: [&str; 6] = ["bwt", "pemd", "nlb", "wwt", "pwwt", "nlw"];

const MISENCODED_BREED: &str = "ÃŽle-de-France";
const CANONICAL_BREED: &str = "Ile-de-France";

/// One animal, ready for the `animals` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalRecord {
    pub id: String,
    pub breed_group: String,
    pub breed: String,
    pub birth_date: Option<String>,
    pub gender: String,
    pub regnum: String,
    pub progeny_total: String,
    pub flock_count: String,
    pub sire: String,
    pub dam: String,
    pub status: String,
    pub genotyped: String,
    pub farm_name: String,
    pub contact_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub bwt: String,
    pub bwt_accuracy: String,
    pub mwwt: String,
    pub pemd: String,
    pub pemd_accuracy: String,
    pub nlb: String,
    pub nlb_accuracy: String,
    pub carcass_plus_index: String,
    pub wwt: String,
    pub wwt_accuracy: String,
    pub pwwt: String,
    pub pwwt_accuracy: String,
    pub pfat: String,
    pub nlw: String,
    pub nlw_accuracy: String,
    pub src_index: String,
}

impl AnimalRecord {
    /// Output column order. `address` sits at position 14 where the two
    /// raw address lines used to be.
    pub const COLUMNS: [&'static str; 33] = [
        "id",
        "breed_group",
        "breed",
        "birth_date",
        "gender",
        "regnum",
        "progeny_total",
        "flock_count",
        "sire",
        "dam",
        "status",
        "genotyped",
        "farm_name",
        "contact_name",
        "address",
        "phone",
        "email",
        "bwt",
        "bwt_accuracy",
        "mwwt",
        "pemd",
        "pemd_accuracy",
        "nlb",
        "nlb_accuracy",
        "carcass_plus_index",
        "wwt",
        "wwt_accuracy",
        "pwwt",
        "pwwt_accuracy",
        "pfat",
        "nlw",
        "nlw_accuracy",
        "src_index",
    ];

    /// Field values in [`Self::COLUMNS`] order.
    pub fn values(&self) -> [Option<&str>; 33] {
        fn s(v: &str) -> Option<&str> {
            Some(v)
        }
        [
            s(&self.id),
            s(&self.breed_group),
            s(&self.breed),
            self.birth_date.as_deref(),
            s(&self.gender),
            s(&self.regnum),
            s(&self.progeny_total),
            s(&self.flock_count),
            s(&self.sire),
            s(&self.dam),
            s(&self.status),
            s(&self.genotyped),
            s(&self.farm_name),
            s(&self.contact_name),
            s(&self.address),
            s(&self.phone),
            s(&self.email),
            s(&self.bwt),
            s(&self.bwt_accuracy),
            s(&self.mwwt),
            s(&self.pemd),
            s(&self.pemd_accuracy),
            s(&self.nlb),
            s(&self.nlb_accuracy),
            s(&self.carcass_plus_index),
            s(&self.wwt),
            s(&self.wwt_accuracy),
            s(&self.pwwt),
            s(&self.pwwt_accuracy),
            s(&self.pfat),
            s(&self.nlw),
            s(&self.nlw_accuracy),
            s(&self.src_index),
        ]
    }
}

/// Keep only the first visual line of a fragment.
pub fn strip_annotation(value: &str) -> &str {
    value.split('\n').next().unwrap_or_default()
}

pub fn join_address(line1: &str, line2: &str) -> String {
    format!("{} {}", line1, line2)
}

/// `MM/DD/YYYY` → `YYYY-MM-DD`; an empty value has no date.
pub fn reformat_birth_date(raw: &str) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .map(|d| Some(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| ScrapeError::parse("birth date", raw))
}

pub fn fix_breed_encoding(breed: String) -> String {
    if breed == MISENCODED_BREED {
        CANONICAL_BREED.to_string()
    } else {
        breed
    }
}

fn take_annotated(raw: &mut RawRecord, field: &str) -> String {
    debug_assert!(ANNOTATED_FIELDS.contains(&field));
    strip_annotation(&raw.take(field)).to_string()
}

/// Turn one page's named fragments into a table row.
pub fn normalize_record(mut raw: RawRecord) -> Result<AnimalRecord> {
    let address = join_address(&raw.take("address1"), &raw.take("address2"));
    let birth_date = reformat_birth_date(&raw.take("birth_date"))?;

    Ok(AnimalRecord {
        id: raw.take("id"),
        breed_group: raw.take("breed_group"),
        breed: fix_breed_encoding(raw.take("breed")),
        birth_date,
        gender: raw.take("gender"),
        regnum: raw.take("regnum"),
        progeny_total: raw.take("progeny_total"),
        flock_count: raw.take("flock_count"),
        sire: raw.take("sire"),
        dam: raw.take("dam"),
        status: raw.take("status"),
        genotyped: raw.take("genotyped"),
        farm_name: raw.take("farm_name"),
        contact_name: raw.take("contact_name"),
        address,
        phone: raw.take("phone"),
        email: raw.take("email"),
        bwt: take_annotated(&mut raw, "bwt"),
        bwt_accuracy: raw.take("bwt_accuracy"),
        mwwt: raw.take("mwwt"),
        pemd: take_annotated(&mut raw, "pemd"),
        pemd_accuracy: raw.take("pemd_accuracy"),
        nlb: take_annotated(&mut raw, "nlb"),
        nlb_accuracy: raw.take("nlb_accuracy"),
        carcass_plus_index: raw.take("carcass_plus_index"),
        wwt: take_annotated(&mut raw, "wwt"),
        wwt_accuracy: raw.take("wwt_accuracy"),
        pwwt: take_annotated(&mut raw, "pwwt"),
        pwwt_accuracy: raw.take("pwwt_accuracy"),
        pfat: raw.take("pfat"),
        nlw: take_annotated(&mut raw, "nlw"),
        nlw_accuracy: raw.take("nlw_accuracy"),
        src_index: raw.take("src_index"),
    })
}

pub fn normalize(rows: Vec<RawRecord>) -> Result<Vec<AnimalRecord>> {
    rows.into_iter().map(normalize_record).collect()
}
