use fake::Fake;
use fake::faker::address::en::{
    BuildingNumber, CityName, CountryName, StateAbbr, StreetName, StreetSuffix, ZipCode,
};
use fake::faker::internet::en::{DomainSuffix, IPv4, Password, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::RngCore;

pub(crate) fn first_name(rng: &mut impl RngCore) -> String {
    FirstName().fake_with_rng(rng)
}

pub(crate) fn last_name(rng: &mut impl RngCore) -> String {
    LastName().fake_with_rng(rng)
}

pub(crate) fn full_name(rng: &mut impl RngCore) -> String {
    Name().fake_with_rng(rng)
}

pub(crate) fn email(rng: &mut impl RngCore) -> String {
    SafeEmail().fake_with_rng(rng)
}

pub(crate) fn username(rng: &mut impl RngCore) -> String {
    Username().fake_with_rng(rng)
}

pub(crate) fn phone_number(rng: &mut impl RngCore) -> String {
    PhoneNumber().fake_with_rng(rng)
}

pub(crate) fn street_address(rng: &mut impl RngCore) -> String {
    let number: String = BuildingNumber().fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    let suffix: String = StreetSuffix().fake_with_rng(rng);
    format!("{number} {street} {suffix}")
}

pub(crate) fn postal_address(rng: &mut impl RngCore) -> String {
    let street = street_address(rng);
    let city: String = CityName().fake_with_rng(rng);
    let state: String = StateAbbr().fake_with_rng(rng);
    let zip: String = ZipCode().fake_with_rng(rng);
    format!("{street}, {city}, {state} {zip}")
}

pub(crate) fn city(rng: &mut impl RngCore) -> String {
    CityName().fake_with_rng(rng)
}

pub(crate) fn country(rng: &mut impl RngCore) -> String {
    CountryName().fake_with_rng(rng)
}

pub(crate) fn url(rng: &mut impl RngCore) -> String {
    let host: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    let path: String = Word().fake_with_rng(rng);
    format!("https://{}.{suffix}/{}", host.to_lowercase(), path.to_lowercase())
}

pub(crate) fn uuid(rng: &mut impl RngCore) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}

pub(crate) fn ipv4(rng: &mut impl RngCore) -> String {
    IPv4().fake_with_rng(rng)
}

pub(crate) fn word(rng: &mut impl RngCore) -> String {
    Word().fake_with_rng(rng)
}

pub(crate) fn words(rng: &mut impl RngCore) -> String {
    let words: Vec<String> = Words(2..5).fake_with_rng(rng);
    words.join(" ")
}

pub(crate) fn sentence(rng: &mut impl RngCore) -> String {
    Sentence(4..10).fake_with_rng(rng)
}

pub(crate) fn paragraph(rng: &mut impl RngCore) -> String {
    Paragraph(2..5).fake_with_rng(rng)
}

pub(crate) fn password(rng: &mut impl RngCore) -> String {
    Password(12..20).fake_with_rng(rng)
}
